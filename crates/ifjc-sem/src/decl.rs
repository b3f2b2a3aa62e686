//! Declarations and the id pool.
//!
//! Every declaration (user variables, synthetic parameter, iterator
//! and optional-binding shadows, and functions) receives a stable
//! id ≥ 1 from a monotonic counter. The id pool maps ids back to
//! declarations and is the emitter's only way to address them; ids
//! are never reused.

use ifjc_par::ast::{BuiltInFunction, NodeId, ValueType};
use indexmap::IndexSet;

/// Either kind of declaration, looked up by id.
#[derive(Debug)]
pub enum Declaration {
    Variable(VariableDecl),
    Function(FunctionDecl),
}

/// A variable declaration.
#[derive(Clone, Debug)]
pub struct VariableDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: ValueType,
    pub is_constant: bool,
    /// False for synthesized parameter, iterator and binding-shadow
    /// declarations, which have no declarator node behind them.
    pub is_user_defined: bool,
    pub is_used: bool,
    pub is_initialized: bool,
}

/// A function parameter's call signature.
#[derive(Clone, Debug)]
pub struct ParamSig {
    /// Label a call site must write. Meaningless when `is_labeless`.
    pub label: String,
    pub internal_name: String,
    pub ty: ValueType,
    pub is_labeless: bool,
    /// Declaration id of the parameter's local variable.
    pub decl_id: NodeId,
}

impl ParamSig {
    /// Returns true when `other` is indistinguishable at a call site.
    pub fn matches(&self, other: &ParamSig) -> bool {
        self.ty == other.ty
            && self.is_labeless == other.is_labeless
            && (self.is_labeless || self.label == other.label)
    }
}

/// A function declaration.
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<ParamSig>,
    pub return_type: ValueType,
    /// Ids of the variables declared in the function body, in
    /// declaration order (parameters are carried in `params`).
    pub locals: IndexSet<NodeId>,
    pub is_used: bool,
    pub builtin: BuiltInFunction,
}

impl FunctionDecl {
    /// Returns true when `other` would be an invalid redeclaration:
    /// same arity, same external labels, same parameter types and
    /// same return type.
    pub fn same_signature(&self, other: &FunctionDecl) -> bool {
        self.params.len() == other.params.len()
            && self.return_type == other.return_type
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| a.matches(b))
    }
}
