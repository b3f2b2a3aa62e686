//! ifjc-sem - Semantic Analyzer
//!
//! ============================================================================
//! SEMANTIC ANALYSIS OVERVIEW
//! ============================================================================
//!
//! Semantic analysis checks the properties a context-free grammar
//! cannot express: that names are declared before use, that types
//! agree, that every call matches a declared signature, and that
//! value-returning functions actually return. It consumes the parsed
//! AST and annotates it in place; the annotated tree plus the
//! declaration tables are the emitter's entire input.
//!
//! PHASES OF ANALYSIS:
//! -------------------
//! 1. BUILT-IN PRE-REGISTRATION
//!    The built-in prelude is itself IFJ23 source: it is parsed with
//!    the ordinary lexer and parser, each declaration is tagged with
//!    its discriminant, and the result is prepended to the user
//!    program.
//!
//! 2. SCOPE CHAINING
//!    Every block gets exactly one scope, linked to its enclosing
//!    block's scope and recording loop and function ownership.
//!
//! 3. FUNCTION COLLECTION
//!    All top-level function declarations are registered up front
//!    (so calls may precede declarations), parameters become body
//!    locals, and overload sets are built with redeclaration checks.
//!
//! 4. STATEMENT ANALYSIS
//!    Every block is walked statement by statement: names bind, types
//!    check and infer, overloads resolve, optional bindings and loop
//!    iterators synthesize shadow declarations, and return
//!    reachability is verified.
//!
//! ============================================================================
//! TYPE SYSTEM
//! ============================================================================
//!
//! A type is a pair (primitive, is-nullable) with
//!
//! ```text
//! primitive ∈ { Invalid, Unknown, Void, Nil, Int, Double, Bool, String }
//! ```
//!
//! `Unknown` means "no constraint from context"; `Nil` is the type of
//! the literal `nil`; `Invalid` is never produced by a successful
//! analysis.
//!
//! ASSIGNABILITY:
//! --------------
//! ```text
//! T  ← T        always
//! T? ← T        nullability widens
//! T? ← nil      nil fits any nullable slot
//! T  ← T?       never (unwrap first)
//! Double ← Int  never for variables
//! ```
//!
//! The ONLY implicit conversion in the language is the Int→Double
//! retyping of integer literals: when context prefers Double, the
//! literal's value is rewritten in place. The original (value, type)
//! pair is kept alongside so a later visit with a different
//! preference rolls the promotion back instead of reparsing.
//!
//! ============================================================================
//! NAME RESOLUTION
//! ============================================================================
//!
//! Lookup walks the scope chain from the use site to the global
//! scope. Back references (scope→parent, scope→function, scope→loop,
//! identifier→declaration) never form cycles because declarations
//! always exist before the nodes that reference them; all of them are
//! stable ids into the declaration pool, not pointers.
//!
//! Every declaration receives an id ≥ 1 from a monotonic counter; ids
//! are never reused and the counter never decreases. Statements that
//! generate labels (if/while/for) draw from the same counter.
//!
//! ============================================================================
//! OVERLOAD RESOLUTION
//! ============================================================================
//!
//! Functions overload on arity, external labels, parameter types and
//! return type. Resolution of a call:
//!
//! 1. Enumerate overloads whose arity matches
//! 2. Walk argument labels (a labeless parameter requires no label;
//!    a labeled parameter requires exactly its label)
//! 3. Resolve each argument with the parameter's type as preferred
//!    and test assignability
//! 4. Narrow survivors by the caller's preferred return type
//! 5. Zero survivors is "no exact matches"; two or more is
//!    "ambiguous use"
//!
//! For `f() + g()` with both sides overloaded on return type, one
//! side is resolved first and its type drives the other, retrying the
//! first side if that fails.
//!
//! The built-in `write` is special-cased: variadic over any scalar
//! type, nullable or not, returning Void.
//!
//! ============================================================================
//! RETURN REACHABILITY
//! ============================================================================
//!
//! A block always returns iff it contains a statement that always
//! returns. A return statement does; an `if` does iff it has an else
//! branch and every branch always returns; nothing else does. A
//! value-returning function whose body does not always return is an
//! error.

pub mod builtins;
pub mod scope;
pub mod types;

mod decl;
mod expr;

use ifjc_par::ast::{
    Block, BuiltInFunction, ElseClause, Expression, ForStatement, FunctionDeclaration,
    IfStatement, LiteralExpression, LiteralValue, NodeId, Primitive, Program, ReturnStatement,
    Statement, Test, ValueType, VariableDeclaration, WhileStatement,
};
use ifjc_util::{DiagResult, Diagnostic, ErrorKind};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

pub use decl::{Declaration, FunctionDecl, ParamSig, VariableDecl};
pub use scope::{Scope, ScopeArena, ScopeId};

/// The semantic analyser.
///
/// After a successful [`Analyser::analyse`] the program is fully
/// annotated: every resolved identifier holds a non-zero id whose
/// declaration exists in the pool, every literal carries its final
/// (possibly promoted) value, and every `if`/`while`/`for`/`return`/
/// `break`/`continue` carries a label id.
#[derive(Debug)]
pub struct Analyser {
    scopes: ScopeArena,
    global_scope: ScopeId,
    /// Function overloads by name, in registration order.
    overloads: IndexMap<String, Vec<NodeId>>,
    /// Id pool: every declaration by its stable id.
    ids: FxHashMap<NodeId, Declaration>,
    /// Global variable declarations, in declaration order.
    globals: IndexSet<NodeId>,
    /// All function declarations, in registration order.
    functions: IndexSet<NodeId>,
    /// Monotonic id counter; never decreased, ids never reused.
    id_counter: NodeId,
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyser {
    pub fn new() -> Self {
        Self {
            scopes: ScopeArena::new(),
            global_scope: ScopeId(0),
            overloads: IndexMap::new(),
            ids: FxHashMap::default(),
            globals: IndexSet::new(),
            functions: IndexSet::new(),
            id_counter: 1,
        }
    }

    /// Analyses the program, annotating it in place.
    pub fn analyse(&mut self, program: &mut Program) -> DiagResult<()> {
        *self = Analyser::new();

        self.register_builtins(program)?;

        self.global_scope = self.chain_block(&mut program.block, None);

        self.collect_function_declarations(&mut program.block)?;

        self.analyse_block(&mut program.block)
    }

    // ------------------------------------------------------------------
    // Queries (the emitter's interface)
    // ------------------------------------------------------------------

    /// Looks up any declaration by id.
    pub fn declaration(&self, id: NodeId) -> Option<&Declaration> {
        if id == 0 {
            return None;
        }
        self.ids.get(&id)
    }

    /// Looks up a variable declaration by id.
    pub fn variable(&self, id: NodeId) -> Option<&VariableDecl> {
        match self.declaration(id) {
            Some(Declaration::Variable(variable)) => Some(variable),
            _ => None,
        }
    }

    fn variable_mut(&mut self, id: NodeId) -> Option<&mut VariableDecl> {
        match self.ids.get_mut(&id) {
            Some(Declaration::Variable(variable)) => Some(variable),
            _ => None,
        }
    }

    /// Looks up a function declaration by id.
    pub fn function(&self, id: NodeId) -> Option<&FunctionDecl> {
        match self.declaration(id) {
            Some(Declaration::Function(function)) => Some(function),
            _ => None,
        }
    }

    fn function_mut(&mut self, id: NodeId) -> Option<&mut FunctionDecl> {
        match self.ids.get_mut(&id) {
            Some(Declaration::Function(function)) => Some(function),
            _ => None,
        }
    }

    /// Returns true when the id names a global variable or a
    /// function.
    pub fn is_declaration_global(&self, id: NodeId) -> bool {
        id != 0 && (self.globals.contains(&id) || self.functions.contains(&id))
    }

    /// Returns the built-in discriminant of the function with the
    /// given id.
    pub fn builtin_by_id(&self, id: NodeId) -> BuiltInFunction {
        self.function(id)
            .map(|f| f.builtin)
            .unwrap_or(BuiltInFunction::None)
    }

    /// Returns a function's overload set.
    pub fn overloads_of(&self, name: &str) -> Option<&[NodeId]> {
        self.overloads.get(name).map(Vec::as_slice)
    }

    /// Global variable declaration ids, in declaration order.
    pub fn globals(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.globals.iter().copied()
    }

    /// All function declaration ids, in registration order.
    pub fn functions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.functions.iter().copied()
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global_scope
    }

    pub(crate) fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    // ------------------------------------------------------------------
    // Pass A: prelude, scope chaining, function collection
    // ------------------------------------------------------------------

    fn next_id(&mut self) -> NodeId {
        let id = self.id_counter;
        self.id_counter += 1;
        id
    }

    fn register_variable(&mut self, declaration: VariableDecl) {
        self.ids
            .insert(declaration.id, Declaration::Variable(declaration));
    }

    /// Parses the built-in prelude, tags each declaration with its
    /// discriminant and prepends it to the user program.
    fn register_builtins(&mut self, program: &mut Program) -> DiagResult<()> {
        let mut prelude = ifjc_par::Parser::new(builtins::SOURCE).parse().map_err(|e| {
            Diagnostic::error(
                ErrorKind::Internal,
                format!("failed to parse built-in prelude: {}", e.message),
            )
        })?;

        if prelude.block.statements.len() != builtins::count() {
            return Err(Diagnostic::error(
                ErrorKind::Internal,
                "built-in prelude declaration count mismatch",
            ));
        }

        for (statement, &tag) in prelude.block.statements.iter_mut().zip(builtins::TAGS) {
            if let Statement::FunctionDeclaration(function) = statement {
                function.builtin = tag;
            }
        }

        program
            .block
            .statements
            .splice(0..0, prelude.block.statements);
        Ok(())
    }

    /// Allocates a scope for the block and every block nested in it.
    fn chain_block(&mut self, block: &mut Block, parent: Option<ScopeId>) -> ScopeId {
        let scope = self.scopes.alloc(parent);
        block.scope = Some(scope.0);

        for statement in &mut block.statements {
            self.chain_statement(statement, scope);
        }

        scope
    }

    fn chain_statement(&mut self, statement: &mut Statement, parent: ScopeId) {
        match statement {
            Statement::If(stmt) => self.chain_if(stmt, parent),
            Statement::While(stmt) => {
                let body = self.chain_block(&mut stmt.body, Some(parent));
                self.scopes.get_mut(body).is_loop_body = true;
            }
            Statement::For(stmt) => {
                let body = self.chain_block(&mut stmt.body, Some(parent));
                self.scopes.get_mut(body).is_loop_body = true;
            }
            Statement::FunctionDeclaration(function) => {
                self.chain_block(&mut function.body, Some(parent));
            }
            _ => {
                // No other statement contains a block.
            }
        }
    }

    fn chain_if(&mut self, stmt: &mut IfStatement, parent: ScopeId) {
        self.chain_block(&mut stmt.body, Some(parent));

        match stmt.alternate.as_deref_mut() {
            Some(ElseClause::Block(block)) => {
                self.chain_block(block, Some(parent));
            }
            Some(ElseClause::If(nested)) => self.chain_if(nested, parent),
            None => {}
        }
    }

    /// Collects every top-level function declaration: assigns ids,
    /// resolves signatures, registers parameters as body-scope
    /// variables and builds the overload sets.
    fn collect_function_declarations(&mut self, block: &mut Block) -> DiagResult<()> {
        for statement in &mut block.statements {
            let function = match statement {
                Statement::FunctionDeclaration(function) => function,
                _ => continue,
            };

            let id = self.next_id();
            function.name.id = id;
            self.functions.insert(id);

            let body_scope = ScopeId(function.body.scope.expect("scopes are linked"));
            self.scopes.get_mut(body_scope).function = Some(id);

            let return_type = match &mut function.return_type {
                Some(reference) => {
                    let primitive = types::resolve_type_name(&reference.name.name);
                    if !primitive.is_valid() {
                        return Err(Diagnostic::error(
                            ErrorKind::Syntax,
                            format!("cannot find type '{}' in scope", reference.name.name),
                        ));
                    }
                    reference.ty = ValueType::new(primitive, reference.is_nullable);
                    reference.ty
                }
                None => ValueType::VOID,
            };

            let mut params = Vec::with_capacity(function.parameters.len());
            for parameter in &mut function.parameters {
                let name = parameter.internal_name.name.clone();

                if parameter.external_name.is_none() && !parameter.is_labeless {
                    return Err(Diagnostic::error(
                        ErrorKind::Syntax,
                        format!("external parameter name missing in parameter '{}'", name),
                    ));
                }
                if let Some(external) = &parameter.external_name {
                    if external.name == name {
                        return Err(Diagnostic::error(
                            ErrorKind::OtherSemantic,
                            format!("parameter name same as external label '{}'", name),
                        ));
                    }
                }

                let primitive = types::resolve_type_name(&parameter.type_annotation.name.name);
                if !primitive.is_valid() {
                    return Err(Diagnostic::error(
                        ErrorKind::Syntax,
                        format!(
                            "cannot find type '{}' in scope",
                            parameter.type_annotation.name.name
                        ),
                    ));
                }
                let ty = ValueType::new(primitive, parameter.type_annotation.is_nullable);
                parameter.type_annotation.ty = ty;

                if self.scopes.declares_locally(&name, body_scope) {
                    return Err(Diagnostic::error(
                        ErrorKind::UndefinedFunction,
                        format!("invalid redeclaration of '{}'", name),
                    ));
                }

                let param_id = self.next_id();
                parameter.internal_name.id = param_id;
                self.register_variable(VariableDecl {
                    id: param_id,
                    name: name.clone(),
                    ty,
                    is_constant: true,
                    is_user_defined: false,
                    is_used: false,
                    is_initialized: true,
                });
                self.scopes
                    .get_mut(body_scope)
                    .variables
                    .insert(name.clone(), param_id);

                params.push(ParamSig {
                    label: parameter.external_label().to_string(),
                    internal_name: name,
                    ty,
                    is_labeless: parameter.is_labeless,
                    decl_id: param_id,
                });
            }

            let declaration = FunctionDecl {
                id,
                name: function.name.name.clone(),
                params,
                return_type,
                locals: IndexSet::new(),
                is_used: false,
                builtin: function.builtin,
            };

            // Redeclaration: same arity, labels, parameter types and
            // return type as an existing overload.
            if let Some(existing) = self.overloads.get(&declaration.name) {
                for other_id in existing.clone() {
                    if let Some(other) = self.function(other_id) {
                        if other.same_signature(&declaration) {
                            return Err(Diagnostic::error(
                                ErrorKind::UndefinedFunction,
                                format!("invalid redeclaration of '{}'", declaration.name),
                            ));
                        }
                    }
                }
            }

            self.overloads
                .entry(declaration.name.clone())
                .or_default()
                .push(id);
            self.ids.insert(id, Declaration::Function(declaration));
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Pass B: statement analysis
    // ------------------------------------------------------------------

    fn analyse_block(&mut self, block: &mut Block) -> DiagResult<()> {
        let scope = ScopeId(block.scope.expect("scopes are linked"));

        for statement in &mut block.statements {
            match statement {
                Statement::VariableDeclaration(declaration) => {
                    self.analyse_variable_declaration(declaration, scope)?;
                }
                Statement::Assignment(assignment) => {
                    let Some(var_id) =
                        self.scopes.lookup_variable(&assignment.target.name, scope)
                    else {
                        return Err(Diagnostic::error(
                            ErrorKind::UndefinedVariable,
                            format!("cannot find '{}' in scope", assignment.target.name),
                        ));
                    };

                    let variable = self
                        .variable(var_id)
                        .cloned()
                        .ok_or_else(|| internal_error("assignment target is not a variable"))?;

                    if variable.is_constant && variable.is_initialized {
                        return Err(Diagnostic::error(
                            ErrorKind::OtherSemantic,
                            format!("cannot assign to constant '{}'", variable.name),
                        ));
                    }

                    let resolved = self.resolve_expression_type(
                        &mut assignment.expression,
                        scope,
                        variable.ty,
                    )?;

                    if !types::is_value_assignable(variable.ty, resolved) {
                        return Err(Diagnostic::error(
                            ErrorKind::TypeIncompatibility,
                            format!(
                                "cannot convert value of type '{}' to specified type '{}'",
                                resolved, variable.ty
                            ),
                        ));
                    }

                    // Initialization only tightens in the declaring
                    // scope; a branch-local assignment does not raise
                    // the flag.
                    let same_scope = self
                        .scopes
                        .declares_locally(&assignment.target.name, scope);
                    if let Some(stored) = self.variable_mut(var_id) {
                        if same_scope {
                            stored.is_initialized = true;
                        }
                        stored.is_used = true;
                    }
                    assignment.target.id = var_id;
                }
                Statement::If(stmt) => self.analyse_if(stmt, scope)?,
                Statement::While(stmt) => self.analyse_while(stmt, scope)?,
                Statement::For(stmt) => self.analyse_for(stmt, scope)?,
                Statement::FunctionDeclaration(function) => {
                    self.analyse_function(function, scope)?;
                }
                Statement::Return(stmt) => self.analyse_return(stmt, scope)?,
                Statement::Break(stmt) => {
                    stmt.id = self.loop_label(scope, "break")?;
                }
                Statement::Continue(stmt) => {
                    stmt.id = self.loop_label(scope, "continue")?;
                }
                Statement::Expression(stmt) => {
                    self.resolve_expression_type(
                        &mut stmt.expression,
                        scope,
                        ValueType::UNKNOWN,
                    )?;
                }
            }
        }

        Ok(())
    }

    fn analyse_variable_declaration(
        &mut self,
        node: &mut VariableDeclaration,
        scope: ScopeId,
    ) -> DiagResult<()> {
        let function = self.scopes.nearest_function(scope);

        for declarator in &mut node.declarators {
            let mut declared_ty = ValueType::UNKNOWN;
            if let Some(annotation) = &mut declarator.pattern.type_annotation {
                let primitive = types::resolve_type_name(&annotation.name.name);
                if !primitive.is_valid() {
                    return Err(Diagnostic::error(
                        ErrorKind::Syntax,
                        format!("cannot find type '{}' in scope", annotation.name.name),
                    ));
                }
                annotation.ty = ValueType::new(primitive, annotation.is_nullable);
                declared_ty = annotation.ty;
            }

            let name = declarator.pattern.name.name.clone();
            let id = self.next_id();
            declarator.pattern.name.id = id;

            let mut ty = declared_ty;
            let mut is_initialized = declarator.initializer.is_some();

            if let Some(initializer) = &mut declarator.initializer {
                let resolved = self.resolve_expression_type(initializer, scope, declared_ty)?;

                if declared_ty.primitive == Primitive::Void {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        "cannot use initializer for variable of type 'Void'",
                    ));
                }

                if declarator.pattern.type_annotation.is_some() {
                    if !types::is_value_assignable(declared_ty, resolved) {
                        return Err(Diagnostic::error(
                            ErrorKind::TypeIncompatibility,
                            format!(
                                "cannot convert value of type '{}' to specified type '{}'",
                                resolved, declared_ty
                            ),
                        ));
                    }
                } else {
                    if resolved.primitive == Primitive::Nil {
                        return Err(Diagnostic::error(
                            ErrorKind::InferenceFailure,
                            "'nil' requires a contextual type",
                        ));
                    }
                    ty = resolved;
                }
            }

            // A nullable variable without an initializer starts at nil.
            if ty.is_nullable && !is_initialized {
                declarator.initializer = Some(Expression::Literal(LiteralExpression::new(
                    ValueType::NIL,
                    LiteralValue::Nil,
                )));
                is_initialized = true;
            }

            if let Some(&existing) = self.scopes.get(scope).variables.get(&name) {
                if self.variable(existing).is_some_and(|v| v.is_user_defined) {
                    return Err(Diagnostic::error(
                        ErrorKind::UndefinedFunction,
                        format!("invalid redeclaration of '{}'", name),
                    ));
                }
            }

            // A global variable may not collide with a zero-arity
            // function.
            if self.scopes.get(scope).parent.is_none() {
                if let Some(list) = self.overloads.get(&name) {
                    let collides = list
                        .iter()
                        .any(|&fid| self.function(fid).is_some_and(|f| f.params.is_empty()));
                    if collides {
                        return Err(Diagnostic::error(
                            ErrorKind::UndefinedFunction,
                            format!("invalid redeclaration of '{}'", name),
                        ));
                    }
                }
            }

            self.register_variable(VariableDecl {
                id,
                name: name.clone(),
                ty,
                is_constant: node.is_constant,
                is_user_defined: true,
                is_used: false,
                is_initialized,
            });
            self.scopes.get_mut(scope).variables.insert(name, id);
            self.record_scoped_variable(id, function);
        }

        Ok(())
    }

    /// Records a declaration in its owning function's locals, or in
    /// the global variable table.
    fn record_scoped_variable(&mut self, id: NodeId, function: Option<NodeId>) {
        match function {
            Some(fid) => {
                if let Some(declaration) = self.function_mut(fid) {
                    declaration.locals.insert(id);
                }
            }
            None => {
                self.globals.insert(id);
            }
        }
    }

    fn analyse_if(&mut self, stmt: &mut IfStatement, scope: ScopeId) -> DiagResult<()> {
        self.validate_test(&mut stmt.test, scope, &mut stmt.body)?;
        stmt.id = self.next_id();
        self.analyse_block(&mut stmt.body)?;

        match stmt.alternate.as_deref_mut() {
            Some(ElseClause::Block(block)) => self.analyse_block(block)?,
            Some(ElseClause::If(nested)) => self.analyse_if(nested, scope)?,
            None => {}
        }

        Ok(())
    }

    fn analyse_while(&mut self, stmt: &mut WhileStatement, scope: ScopeId) -> DiagResult<()> {
        self.validate_test(&mut stmt.test, scope, &mut stmt.body)?;
        stmt.id = self.next_id();

        let body_scope = ScopeId(stmt.body.scope.expect("scopes are linked"));
        self.scopes.get_mut(body_scope).loop_id = stmt.id;

        self.analyse_block(&mut stmt.body)
    }

    fn analyse_for(&mut self, stmt: &mut ForStatement, scope: ScopeId) -> DiagResult<()> {
        let start_ty = self.resolve_expression_type(&mut stmt.range.start, scope, ValueType::INT)?;
        let end_ty = self.resolve_expression_type(&mut stmt.range.end, scope, ValueType::INT)?;

        let start_ok = types::is_value_assignable(ValueType::INT, start_ty);
        let end_ok = types::is_value_assignable(ValueType::INT, end_ty);
        if !start_ok || !end_ok {
            let offending = if !start_ok { start_ty } else { end_ty };
            return Err(Diagnostic::error(
                ErrorKind::TypeIncompatibility,
                format!(
                    "cannot convert value of type '{}' to specified type 'Int'",
                    offending
                ),
            ));
        }

        let function = self.scopes.nearest_function(scope);
        let iterator_id = self.next_id();
        self.register_variable(VariableDecl {
            id: iterator_id,
            name: stmt.iterator.name.clone(),
            ty: ValueType::INT,
            is_constant: true,
            is_user_defined: false,
            is_used: false,
            is_initialized: true,
        });

        let body_scope = ScopeId(stmt.body.scope.expect("scopes are linked"));
        self.scopes
            .get_mut(body_scope)
            .variables
            .insert(stmt.iterator.name.clone(), iterator_id);
        self.record_scoped_variable(iterator_id, function);
        stmt.iterator.id = iterator_id;

        // A hidden slot keeps the evaluated end bound across
        // iterations.
        let end_id = self.next_id();
        self.register_variable(VariableDecl {
            id: end_id,
            name: format!("$range_end_{}", end_id),
            ty: ValueType::INT,
            is_constant: true,
            is_user_defined: false,
            is_used: true,
            is_initialized: true,
        });
        self.record_scoped_variable(end_id, function);
        stmt.range.end_id = end_id;

        stmt.id = self.next_id();
        self.scopes.get_mut(body_scope).loop_id = stmt.id;

        self.analyse_block(&mut stmt.body)
    }

    fn analyse_function(
        &mut self,
        function: &mut FunctionDeclaration,
        scope: ScopeId,
    ) -> DiagResult<()> {
        // Only top-level declarations were collected.
        if function.name.id == 0 {
            return Err(Diagnostic::error(
                ErrorKind::Syntax,
                format!(
                    "function '{}' can only be declared at the top level",
                    function.name.name
                ),
            ));
        }

        self.analyse_block(&mut function.body)?;

        let declaration = self
            .function(function.name.id)
            .ok_or_else(|| internal_error("function declaration missing from id pool"))?;
        let return_type = declaration.return_type;
        let zero_arity = declaration.params.is_empty();

        // A zero-arity function may not collide with a reachable
        // variable.
        if zero_arity
            && self
                .scopes
                .lookup_variable(&function.name.name, scope)
                .is_some()
        {
            return Err(Diagnostic::error(
                ErrorKind::UndefinedFunction,
                format!("invalid redeclaration of '{}'", function.name.name),
            ));
        }

        if return_type.primitive != Primitive::Void && !block_always_returns(&function.body) {
            return Err(Diagnostic::error(
                ErrorKind::InvalidReturn,
                format!(
                    "missing return in global function expected to return '{}'",
                    return_type
                ),
            ));
        }

        Ok(())
    }

    fn analyse_return(&mut self, stmt: &mut ReturnStatement, scope: ScopeId) -> DiagResult<()> {
        let Some(function_id) = self.scopes.nearest_function(scope) else {
            return Err(Diagnostic::error(
                ErrorKind::Syntax,
                "return invalid outside of a func",
            ));
        };

        let return_type = self
            .function(function_id)
            .ok_or_else(|| internal_error("function declaration missing from id pool"))?
            .return_type;

        if return_type.primitive != Primitive::Void && stmt.expression.is_none() {
            return Err(Diagnostic::error(
                ErrorKind::InvalidReturn,
                "non-void function should return a value",
            ));
        }

        if let Some(expression) = &mut stmt.expression {
            let ty = self.resolve_expression_type(expression, scope, return_type)?;

            if !types::is_value_assignable(return_type, ty) {
                if return_type.primitive == Primitive::Void {
                    return Err(Diagnostic::error(
                        ErrorKind::InvalidReturn,
                        "unexpected non-void return value in void function",
                    ));
                }

                return Err(Diagnostic::error(
                    ErrorKind::InvalidCallType,
                    format!(
                        "cannot convert value of type '{}' to specified type '{}'",
                        ty, return_type
                    ),
                ));
            }
        }

        stmt.id = function_id;
        if let Some(declaration) = self.function_mut(function_id) {
            declaration.is_used = true;
        }

        Ok(())
    }

    fn loop_label(&mut self, scope: ScopeId, which: &str) -> DiagResult<NodeId> {
        match self.scopes.nearest_loop(scope) {
            Some(loop_scope) => Ok(self.scopes.get(loop_scope).loop_id),
            None => Err(Diagnostic::error(
                ErrorKind::Syntax,
                format!("'{}' is only allowed inside a loop", which),
            )),
        }
    }

    /// Checks an `if`/`while` test. An optional binding synthesizes
    /// the unwrapped shadow in the body scope; a plain expression
    /// must be non-null Bool.
    fn validate_test(
        &mut self,
        test: &mut Test,
        scope: ScopeId,
        body: &mut Block,
    ) -> DiagResult<()> {
        match test {
            Test::OptionalBinding(binding) => {
                let Some(outer_id) = self.scopes.lookup_variable(&binding.name.name, scope)
                else {
                    return Err(Diagnostic::error(
                        ErrorKind::UndefinedVariable,
                        format!("cannot find '{}' in scope", binding.name.name),
                    ));
                };

                let outer = self
                    .variable(outer_id)
                    .cloned()
                    .ok_or_else(|| internal_error("binding target is not a variable"))?;

                if !outer.ty.is_nullable {
                    return Err(Diagnostic::error(
                        ErrorKind::OtherSemantic,
                        format!(
                            "initializer for conditional binding must have Optional type, not '{}'",
                            outer.ty
                        ),
                    ));
                }

                let function = self.scopes.nearest_function(scope);
                let shadow_id = self.next_id();
                self.register_variable(VariableDecl {
                    id: shadow_id,
                    name: outer.name.clone(),
                    ty: outer.ty.unwrapped(),
                    is_constant: true,
                    is_user_defined: false,
                    is_used: false,
                    is_initialized: true,
                });

                let body_scope = ScopeId(body.scope.expect("scopes are linked"));
                self.scopes
                    .get_mut(body_scope)
                    .variables
                    .insert(outer.name, shadow_id);
                self.record_scoped_variable(shadow_id, function);

                binding.name.id = shadow_id;
                binding.from_id = outer_id;
            }
            Test::Expression(expression) => {
                let ty = self.resolve_expression_type(expression, scope, ValueType::BOOL)?;

                if ty.primitive != Primitive::Bool {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        types::boolean_test_error(ty),
                    ));
                }
                if ty.is_nullable {
                    return Err(Diagnostic::error(
                        ErrorKind::TypeIncompatibility,
                        format!(
                            "value of optional type '{}' must be unwrapped to a value of type 'Bool'",
                            ty
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Builds an internal-compiler-error diagnostic.
pub(crate) fn internal_error(message: &str) -> Diagnostic {
    Diagnostic::error(ErrorKind::Internal, message)
}

/// A block always returns iff some statement in it always returns.
fn block_always_returns(block: &Block) -> bool {
    block.statements.iter().any(statement_always_returns)
}

/// A return statement always returns; an `if` does iff it has an
/// alternate and every branch always returns; nothing else does.
fn statement_always_returns(statement: &Statement) -> bool {
    match statement {
        Statement::Return(_) => true,
        Statement::If(stmt) => if_always_returns(stmt),
        _ => false,
    }
}

fn if_always_returns(stmt: &IfStatement) -> bool {
    let Some(alternate) = stmt.alternate.as_deref() else {
        return false;
    };

    block_always_returns(&stmt.body)
        && match alternate {
            ElseClause::Block(block) => block_always_returns(block),
            ElseClause::If(nested) => if_always_returns(nested),
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifjc_par::ast::VariableDeclarator;

    fn analyse(source: &str) -> DiagResult<(Analyser, Program)> {
        let mut program = ifjc_par::Parser::new(source).parse()?;
        let mut analyser = Analyser::new();
        analyser.analyse(&mut program)?;
        Ok((analyser, program))
    }

    fn analyse_ok(source: &str) -> (Analyser, Program) {
        analyse(source).expect("program should analyse")
    }

    fn analyse_err(source: &str) -> ErrorKind {
        analyse(source).expect_err("program should be rejected").kind
    }

    /// The user program starts after the built-in prelude.
    fn user_statements(program: &Program) -> &[Statement] {
        &program.block.statements[builtins::count()..]
    }

    fn declarator(statement: &Statement) -> &VariableDeclarator {
        match statement {
            Statement::VariableDeclaration(declaration) => &declaration.declarators[0],
            other => panic!("expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_two_globals_reference_each_other() {
        let (analyser, program) = analyse_ok("let a = 7\nlet b: Int = a");
        let statements = user_statements(&program);

        let a_id = declarator(&statements[0]).pattern.name.id;
        let b_decl = declarator(&statements[1]);
        let b_id = b_decl.pattern.name.id;

        assert_ne!(a_id, 0);
        assert_ne!(b_id, 0);
        assert_ne!(a_id, b_id);
        assert!(analyser.is_declaration_global(a_id));
        assert!(analyser.is_declaration_global(b_id));

        // b's initializer references a's declaration.
        match b_decl.initializer.as_ref().expect("initialized") {
            Expression::Identifier(identifier) => assert_eq!(identifier.id, a_id),
            other => panic!("expected identifier initializer, got {:?}", other),
        }
    }

    #[test]
    fn test_uninitialized_use_is_rejected() {
        assert_eq!(
            analyse_err("let a: Int\nlet b: Int = a"),
            ErrorKind::UndefinedVariable
        );
    }

    #[test]
    fn test_initialization_does_not_tighten_across_branches() {
        let source = "var a: Int\nif true {\n a = 1 \n}\nlet b = a";
        assert_eq!(analyse_err(source), ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_same_scope_assignment_initializes() {
        let source = "var a: Int\na = 1\nlet b = a";
        analyse_ok(source);
    }

    #[test]
    fn test_overload_selected_by_preferred_type_promotes_literal() {
        let source = "func f() -> Int {\n return 1 \n}\n\
                      func f() -> Double {\n return 1.5 \n}\n\
                      let v: Double = f() + 5";
        let (analyser, program) = analyse_ok(source);
        let statements = user_statements(&program);

        let v_decl = declarator(&statements[2]);
        let Some(Expression::Binary(sum)) = v_decl.initializer.as_ref() else {
            panic!("expected binary initializer");
        };

        // The call picked the Double overload.
        let Expression::FunctionCall(call) = &*sum.left else {
            panic!("expected call on the left");
        };
        let chosen = analyser.function(call.name.id).expect("resolved");
        assert_eq!(chosen.return_type, ValueType::DOUBLE);

        // The literal 5 was promoted in place, keeping its original.
        let Expression::Literal(literal) = &*sum.right else {
            panic!("expected literal on the right");
        };
        assert_eq!(literal.ty, ValueType::DOUBLE);
        assert_eq!(literal.value, LiteralValue::Floating(5.0));
        assert_eq!(literal.original_value, LiteralValue::Integer(5));

        assert_eq!(sum.ty, ValueType::DOUBLE);
    }

    #[test]
    fn test_overloads_without_context_are_ambiguous() {
        let source = "func f() -> Int {\n return 1 \n}\n\
                      func f() -> Double {\n return 1.5 \n}\n\
                      func g() -> Int {\n return 1 \n}\n\
                      func g() -> Double {\n return 1.5 \n}\n\
                      let v = f() + g()";
        assert_eq!(analyse_err(source), ErrorKind::OtherSemantic);
    }

    #[test]
    fn test_optional_binding_creates_distinct_shadow() {
        let source = "var a: Int? = nil\nif let a {\n var b: Int = a \n}";
        let (analyser, program) = analyse_ok(source);
        let statements = user_statements(&program);

        let outer_id = declarator(&statements[0]).pattern.name.id;
        let Statement::If(if_stmt) = &statements[1] else {
            panic!("expected if statement");
        };
        let Test::OptionalBinding(binding) = &if_stmt.test else {
            panic!("expected optional binding");
        };

        assert_eq!(binding.from_id, outer_id);
        assert_ne!(binding.name.id, outer_id);

        let shadow = analyser.variable(binding.name.id).expect("shadow exists");
        assert_eq!(shadow.ty, ValueType::INT);
        assert!(!shadow.is_user_defined);

        // `b`'s initializer resolves to the shadow, not the outer a.
        let Statement::VariableDeclaration(b_decl) = &if_stmt.body.statements[0] else {
            panic!("expected declaration in body");
        };
        match b_decl.declarators[0].initializer.as_ref().expect("init") {
            Expression::Identifier(identifier) => assert_eq!(identifier.id, binding.name.id),
            other => panic!("expected identifier, got {:?}", other),
        }
    }

    #[test]
    fn test_binding_requires_nullable_source() {
        assert_eq!(
            analyse_err("var a: Int = 1\nif let a {\n}"),
            ErrorKind::OtherSemantic
        );
    }

    #[test]
    fn test_missing_else_fails_reachability() {
        assert_eq!(
            analyse_err("func f() -> Int {\n if true { return 1 }\n}"),
            ErrorKind::InvalidReturn
        );
    }

    #[test]
    fn test_if_else_chain_reaches_return() {
        let source = "func f(_ x: Int) -> Int {\n\
                      if x < 0 { return 0 } else if x < 10 { return 1 } else { return 2 }\n\
                      }";
        analyse_ok(source);
    }

    #[test]
    fn test_constant_reassignment_rejected() {
        assert_eq!(analyse_err("let a = 1\na = 2"), ErrorKind::OtherSemantic);
    }

    #[test]
    fn test_redeclaration_in_same_scope_rejected() {
        assert_eq!(
            analyse_err("let a = 1\nvar a = 2"),
            ErrorKind::UndefinedFunction
        );
    }

    #[test]
    fn test_shadowing_in_nested_scope_allowed() {
        analyse_ok("let a = 1\nif true {\n let a = 2\n write(a)\n}");
    }

    #[test]
    fn test_nullable_variable_defaults_to_nil() {
        let (_, program) = analyse_ok("var a: Int?");
        let statements = user_statements(&program);
        let decl = declarator(&statements[0]);

        match decl.initializer.as_ref().expect("default initializer") {
            Expression::Literal(literal) => assert_eq!(literal.value, LiteralValue::Nil),
            other => panic!("expected nil literal, got {:?}", other),
        }
    }

    #[test]
    fn test_nil_without_context_fails_inference() {
        assert_eq!(analyse_err("let a = nil"), ErrorKind::InferenceFailure);
    }

    #[test]
    fn test_void_annotation_with_initializer_rejected() {
        let source = "func f() {\n}\nlet x: Void = f()";
        assert_eq!(analyse_err(source), ErrorKind::TypeIncompatibility);
    }

    #[test]
    fn test_void_inference_without_annotation_allowed() {
        // The unannotated form infers Void; asymmetric on purpose.
        analyse_ok("func f() {\n}\nlet x = f()");
    }

    #[test]
    fn test_return_outside_function_rejected() {
        assert_eq!(analyse_err("return 1"), ErrorKind::Syntax);
    }

    #[test]
    fn test_break_outside_loop_rejected() {
        assert_eq!(analyse_err("break"), ErrorKind::Syntax);
    }

    #[test]
    fn test_break_binds_to_enclosing_loop() {
        let source = "while true {\n if true { break }\n}";
        let (_, program) = analyse_ok(source);
        let statements = user_statements(&program);

        let Statement::While(while_stmt) = &statements[0] else {
            panic!("expected while");
        };
        let Statement::If(if_stmt) = &while_stmt.body.statements[0] else {
            panic!("expected if");
        };
        let Statement::Break(break_stmt) = &if_stmt.body.statements[0] else {
            panic!("expected break");
        };

        assert_eq!(break_stmt.id, while_stmt.id);
        assert_ne!(break_stmt.id, 0);
    }

    #[test]
    fn test_for_synthesizes_int_iterator() {
        let (analyser, program) = analyse_ok("for i in 1...3 {\n write(i)\n}");
        let statements = user_statements(&program);

        let Statement::For(for_stmt) = &statements[0] else {
            panic!("expected for");
        };
        let iterator = analyser.variable(for_stmt.iterator.id).expect("iterator");
        assert_eq!(iterator.ty, ValueType::INT);
        assert!(iterator.is_constant);
        assert_ne!(for_stmt.range.end_id, 0);
    }

    #[test]
    fn test_for_bounds_must_be_int() {
        assert_eq!(
            analyse_err("for i in 1...2.5 {\n}"),
            ErrorKind::TypeIncompatibility
        );
    }

    #[test]
    fn test_relational_mixed_types_rejected() {
        let source = "var d: Double = 1.0\nvar i: Int = 1\nlet x = d < i";
        assert_eq!(analyse_err(source), ErrorKind::TypeIncompatibility);
    }

    #[test]
    fn test_arithmetic_on_nullable_rejected() {
        let source = "var a: Int? = 1\nlet b = a + 1";
        assert_eq!(analyse_err(source), ErrorKind::TypeIncompatibility);
    }

    #[test]
    fn test_unwrap_then_arithmetic_allowed() {
        analyse_ok("var a: Int? = 1\nlet b = a! + 1");
    }

    #[test]
    fn test_unwrap_of_non_optional_rejected() {
        assert_eq!(
            analyse_err("let a = 1\nlet b = a!"),
            ErrorKind::TypeIncompatibility
        );
    }

    #[test]
    fn test_coalescing_types() {
        let source = "var a: Int? = nil\nlet b = a ?? 3";
        let (analyser, program) = analyse_ok(source);
        let statements = user_statements(&program);

        let b_id = declarator(&statements[1]).pattern.name.id;
        let b = analyser.variable(b_id).expect("declared");
        // The result keeps the left side's nullability.
        assert_eq!(b.ty.primitive, Primitive::Int);
        assert!(b.ty.is_nullable);
    }

    #[test]
    fn test_coalescing_nullable_right_rejected() {
        let source = "var a: Int? = nil\nvar c: Int? = 1\nlet b = a ?? c";
        assert_eq!(analyse_err(source), ErrorKind::TypeIncompatibility);
    }

    #[test]
    fn test_equality_with_nil_yields_nullable_bool_test_rejected() {
        // `a == nil` types as Bool?, which a test must not be.
        let source = "var a: Int? = nil\nif a == nil {\n}";
        assert_eq!(analyse_err(source), ErrorKind::TypeIncompatibility);
    }

    #[test]
    fn test_write_accepts_mixed_scalars() {
        analyse_ok("var a: Int? = nil\nwrite(\"x\", 1, 2.5, true, a)");
    }

    #[test]
    fn test_write_rejects_void_argument() {
        let source = "func f() {\n}\nwrite(f())";
        assert_eq!(analyse_err(source), ErrorKind::InvalidCallType);
    }

    #[test]
    fn test_call_arity_mismatch() {
        let source = "func f(_ x: Int) -> Int {\n return x \n}\nlet a = f(1, 2)";
        assert_eq!(analyse_err(source), ErrorKind::InvalidCallType);
    }

    #[test]
    fn test_call_label_checking() {
        let ok = "func f(with x: Int) -> Int {\n return x \n}\nlet a = f(with: 1)";
        analyse_ok(ok);

        let missing = "func f(with x: Int) -> Int {\n return x \n}\nlet a = f(1)";
        assert_eq!(analyse_err(missing), ErrorKind::OtherSemantic);

        let extraneous = "func f(_ x: Int) -> Int {\n return x \n}\nlet a = f(with: 1)";
        assert_eq!(analyse_err(extraneous), ErrorKind::OtherSemantic);
    }

    #[test]
    fn test_parameter_label_must_differ_from_name() {
        assert_eq!(
            analyse_err("func f(x x: Int) {\n}"),
            ErrorKind::OtherSemantic
        );
    }

    #[test]
    fn test_parameter_without_label_rejected() {
        assert_eq!(analyse_err("func f(x: Int) {\n}"), ErrorKind::Syntax);
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        assert_eq!(
            analyse_err("func f(a x: Int, b x: Int) {\n}"),
            ErrorKind::UndefinedFunction
        );
    }

    #[test]
    fn test_overload_redeclaration_rejected() {
        let source = "func f(_ x: Int) -> Int {\n return x \n}\n\
                      func f(_ y: Int) -> Int {\n return y \n}";
        assert_eq!(analyse_err(source), ErrorKind::UndefinedFunction);
    }

    #[test]
    fn test_overload_on_labels_allowed() {
        let source = "func f(of x: Int) -> Int {\n return x \n}\n\
                      func f(at x: Int) -> Int {\n return x \n}\n\
                      let a = f(of: 1)\nlet b = f(at: 2)";
        analyse_ok(source);
    }

    #[test]
    fn test_global_variable_colliding_with_zero_arity_function() {
        assert_eq!(
            analyse_err("func f() -> Int {\n return 1 \n}\nlet f = 1"),
            ErrorKind::UndefinedFunction
        );
    }

    #[test]
    fn test_local_variable_shadows_function_in_call() {
        let source = "func f() -> Int {\n return 1 \n}\n\
                      func g() -> Int {\n let f = 1\n return f()\n}";
        assert_eq!(analyse_err(source), ErrorKind::InvalidCallType);
    }

    #[test]
    fn test_ids_are_unique_and_registered() {
        let source = "let a = 1\nvar b = 2.5\nfunc f(_ x: Int) -> Int {\n return x \n}\n\
                      let c = f(3)";
        let (analyser, program) = analyse_ok(source);

        let mut seen = std::collections::HashSet::new();
        for statement in user_statements(&program) {
            if let Statement::VariableDeclaration(declaration) = statement {
                for declarator in &declaration.declarators {
                    let id = declarator.pattern.name.id;
                    assert!(id >= 1);
                    assert!(seen.insert(id), "id {} reused", id);
                    assert!(analyser.declaration(id).is_some());
                }
            }
        }
    }

    #[test]
    fn test_prelude_functions_are_tagged() {
        let (analyser, _) = analyse_ok("");

        let write = analyser.overloads_of("write").expect("write registered");
        assert_eq!(analyser.builtin_by_id(write[0]), BuiltInFunction::Write);

        let substring = analyser.overloads_of("substring").expect("registered");
        assert_eq!(
            analyser.builtin_by_id(substring[0]),
            BuiltInFunction::Substring
        );

        let stringify = analyser.overloads_of("__stringify__").expect("registered");
        assert_eq!(stringify.len(), 4);
    }

    #[test]
    fn test_builtin_calls_resolve() {
        let source = "let s = readString()\n\
                      let n = readInt()\n\
                      let d = Int2Double(3)\n\
                      let t = substring(of: \"abc\", startingAt: 0, endingBefore: 2)\n\
                      let o = ord(\"a\")\nlet c = chr(98)\nlet l = length(\"xy\")";
        let (analyser, program) = analyse_ok(source);
        let statements = user_statements(&program);

        let s_id = declarator(&statements[0]).pattern.name.id;
        assert_eq!(
            analyser.variable(s_id).unwrap().ty,
            ValueType::STRING.nullable()
        );

        let d_id = declarator(&statements[2]).pattern.name.id;
        assert_eq!(analyser.variable(d_id).unwrap().ty, ValueType::DOUBLE);
    }
}
