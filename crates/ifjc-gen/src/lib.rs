//! ifjc-gen - Code Generator (IFJcode23 Emitter)
//!
//! ============================================================================
//! CODE GENERATION OVERVIEW
//! ============================================================================
//!
//! The final phase: the analyser-annotated AST goes in, textual
//! IFJcode23 assembly comes out. No optimization is performed; the
//! emitter is a straight syntax-directed translation.
//!
//! ============================================================================
//! TARGET MACHINE MODEL
//! ============================================================================
//!
//! IFJcode23 is a stack-based three-address intermediate language run
//! by an interpreter. The relevant machine state:
//!
//! ```text
//! GF@x   global frame variable       (lives for the whole program)
//! LF@x   local frame variable        (top of the frame stack)
//! TF@x   temporary frame variable    (frame under construction)
//! data stack                          PUSHS / POPS / ADDS / ...
//! call stack                          CALL / RETURN
//! ```
//!
//! `CREATEFRAME` makes a fresh TF (discarding any previous one),
//! `PUSHFRAME` moves TF onto the frame stack as the new LF, and
//! `POPFRAME` moves it back.
//!
//! ADDRESSING BY ID:
//! -----------------
//! Every variable is addressed by its stable declaration id
//! (`GF@$7` / `LF@$7`) and every label derives from the id the
//! analyser put on the owning statement (`$if_12_else`,
//! `$loop_9_end`, `$fn_3`). The emitter therefore needs no name
//! information at all.
//!
//! ============================================================================
//! OUTPUT LAYOUT
//! ============================================================================
//!
//! ```text
//! .IFJcode23
//! DEFVAR GF@%tmp1 ...            helper globals
//! DEFVAR GF@$<id> ...            every global declaration
//! <global statements>            the main body
//! EXIT int@0
//! LABEL $fn_<id> ...             user and prelude functions
//! LABEL $fn_<id> ...             native bodies of the built-ins
//! ```
//!
//! All locals of a function are `DEFVAR`ed up front from the
//! analyser's per-function table, so a declaration inside a loop body
//! never redefines its slot.
//!
//! ============================================================================
//! EXPRESSION EVALUATION
//! ============================================================================
//!
//! Expressions evaluate on the data stack: operands push, operators
//! combine (`ADDS`, `MULS`, `LTS`, ...), and exactly one value is left
//! per expression. String `+` detours through helper globals for
//! `CONCAT`; `??` lowers to a nil test with fresh labels; a postfix
//! `!` is a no-op on the value stack. Where the analyser accepted an
//! Int literal against a Double operand without rewriting it, the
//! widening materializes as `INT2FLOATS`.
//!
//! ============================================================================
//! CALLING CONVENTION
//! ============================================================================
//!
//! 1. Caller evaluates all arguments onto the data stack
//!    (before CREATEFRAME, so nested calls cannot clobber the frame)
//! 2. Caller CREATEFRAMEs, DEFVARs one TF@$<id> per parameter and
//!    POPS into them in reverse
//! 3. CALL $fn_<id>; callee PUSHFRAMEs, making the parameters LF@
//! 4. The return value travels back on the data stack;
//!    callee POPFRAMEs and RETURNs
//!
//! The ten language built-ins get native instruction bodies (READ,
//! WRITE, INT2FLOAT, STRLEN, STRI2INT, INT2CHAR, GETCHAR/CONCAT loops
//! for substring); `write` is variadic and lowers inline at each call
//! site through the prelude's `__stringify__` overloads, which also
//! back string interpolation.

mod instruction;

pub use instruction::Assembly;

use ifjc_par::ast::{
    Argument, Block, BuiltInFunction, ElseClause, Expression, ForStatement, FunctionCall,
    FunctionDeclaration, IfStatement, InterpolationExpression, LiteralValue, NodeId,
    OperatorType, Primitive, Program, Statement, Test, ValueType, WhileStatement,
};
use ifjc_sem::{Analyser, FunctionDecl};

use instruction::{bool_symb, float_symb, int_symb, nil_symb, string_symb};

/// The code generator.
pub struct Codegen<'a> {
    analyser: &'a Analyser,
    asm: Assembly,
    /// Counter for labels not tied to an analyser id (`??` lowering,
    /// write's nil tests).
    label_counter: u64,
}

impl<'a> Codegen<'a> {
    pub fn new(analyser: &'a Analyser) -> Self {
        Self {
            analyser,
            asm: Assembly::new(),
            label_counter: 0,
        }
    }

    /// Generates the whole program.
    pub fn generate(mut self, program: &Program) -> String {
        self.asm.comment("helper variables");
        self.asm.defvar("GF@%tmp1");
        self.asm.defvar("GF@%tmp2");

        self.asm.comment("global variables");
        for id in self.analyser.globals() {
            let var = self.var(id);
            self.asm.defvar(&var);
        }
        self.asm.blank();

        self.asm.comment("main body");
        for statement in &program.block.statements {
            if matches!(statement, Statement::FunctionDeclaration(_)) {
                continue;
            }
            self.emit_statement(statement);
        }
        self.asm.exit(0);
        self.asm.blank();

        for statement in &program.block.statements {
            if let Statement::FunctionDeclaration(function) = statement {
                self.emit_function(function);
            }
        }

        self.asm.finish()
    }

    // ----------------------------------------------------------------
    // Functions
    // ----------------------------------------------------------------

    fn emit_function(&mut self, function: &FunctionDeclaration) {
        let Some(declaration) = self.analyser.function(function.name.id) else {
            return;
        };
        let declaration = declaration.clone();

        match declaration.builtin {
            BuiltInFunction::Write => {
                // Variadic; lowered inline at every call site.
            }
            BuiltInFunction::None | BuiltInFunction::Stringify | BuiltInFunction::Modulo => {
                self.emit_user_function(function, &declaration);
            }
            _ => self.emit_native_function(&declaration),
        }
    }

    fn emit_user_function(&mut self, function: &FunctionDeclaration, decl: &FunctionDecl) {
        self.asm
            .comment(format!("func {} ({})", decl.name, decl.id));
        self.asm.label(&function_label(decl.id));
        self.asm.pushframe();

        for &local in &decl.locals {
            self.asm.defvar(&format!("LF@${}", local));
        }

        self.emit_block(&function.body);

        // Falling off the end is only reachable in Void functions.
        self.asm.popframe();
        self.asm.ret();
        self.asm.blank();
    }

    /// Emits the instruction-level body of one of the tagged
    /// built-ins.
    fn emit_native_function(&mut self, decl: &FunctionDecl) {
        self.asm
            .comment(format!("built-in {} ({})", decl.name, decl.id));
        self.asm.label(&function_label(decl.id));
        self.asm.pushframe();

        let param = |index: usize| format!("LF@${}", decl.params[index].decl_id);

        match decl.builtin {
            BuiltInFunction::ReadString => {
                self.asm.defvar("LF@%in");
                self.asm.read("LF@%in", "string");
                self.asm.pushs("LF@%in");
            }
            BuiltInFunction::ReadInt => {
                self.asm.defvar("LF@%in");
                self.asm.read("LF@%in", "int");
                self.asm.pushs("LF@%in");
            }
            BuiltInFunction::ReadDouble => {
                self.asm.defvar("LF@%in");
                self.asm.read("LF@%in", "float");
                self.asm.pushs("LF@%in");
            }
            BuiltInFunction::IntToDouble => {
                self.asm.pushs(&param(0));
                self.asm.int2floats();
            }
            BuiltInFunction::DoubleToInt => {
                self.asm.pushs(&param(0));
                self.asm.float2ints();
            }
            BuiltInFunction::Length => {
                self.asm.defvar("LF@%len");
                self.asm.strlen("LF@%len", &param(0));
                self.asm.pushs("LF@%len");
            }
            BuiltInFunction::Chr => {
                self.asm.pushs(&param(0));
                self.asm.int2chars();
            }
            BuiltInFunction::Ord => self.emit_ord_body(decl, &param(0)),
            BuiltInFunction::Substring => self.emit_substring_body(decl),
            _ => unreachable!("not a native built-in"),
        }

        self.asm.popframe();
        self.asm.ret();
        self.asm.blank();
    }

    /// `ord(c)`: code of the first character, 0 for the empty string.
    fn emit_ord_body(&mut self, decl: &FunctionDecl, param: &str) {
        let empty = format!("$ord_{}_empty", decl.id);
        let done = format!("$ord_{}_done", decl.id);

        self.asm.defvar("LF@%len");
        self.asm.defvar("LF@%code");
        self.asm.strlen("LF@%len", param);
        self.asm.jumpifeq(&empty, "LF@%len", &int_symb(0));
        self.asm.stri2int("LF@%code", param, &int_symb(0));
        self.asm.pushs("LF@%code");
        self.asm.jump(&done);
        self.asm.label(&empty);
        self.asm.pushs(&int_symb(0));
        self.asm.label(&done);
    }

    /// `substring(of:startingAt:endingBefore:)`: nil outside bounds,
    /// otherwise a character-by-character copy of `s[i..j]`.
    fn emit_substring_body(&mut self, decl: &FunctionDecl) {
        let s = format!("LF@${}", decl.params[0].decl_id);
        let i = format!("LF@${}", decl.params[1].decl_id);
        let j = format!("LF@${}", decl.params[2].decl_id);

        let nil = format!("$substring_{}_nil", decl.id);
        let head = format!("$substring_{}_loop", decl.id);
        let done = format!("$substring_{}_done", decl.id);

        self.asm.defvar("LF@%len");
        self.asm.defvar("LF@%res");
        self.asm.defvar("LF@%idx");
        self.asm.defvar("LF@%ch");
        self.asm.defvar("LF@%cond");

        self.asm.strlen("LF@%len", &s);
        self.asm.lt("LF@%cond", &i, &int_symb(0));
        self.asm.jumpifeq(&nil, "LF@%cond", &bool_symb(true));
        self.asm.lt("LF@%cond", &j, &int_symb(0));
        self.asm.jumpifeq(&nil, "LF@%cond", &bool_symb(true));
        self.asm.gt("LF@%cond", &i, &j);
        self.asm.jumpifeq(&nil, "LF@%cond", &bool_symb(true));
        self.asm.lt("LF@%cond", &i, "LF@%len");
        self.asm.jumpifeq(&nil, "LF@%cond", &bool_symb(false));
        self.asm.gt("LF@%cond", &j, "LF@%len");
        self.asm.jumpifeq(&nil, "LF@%cond", &bool_symb(true));

        self.asm.move_symb("LF@%res", &string_symb(""));
        self.asm.move_symb("LF@%idx", &i);
        self.asm.label(&head);
        self.asm.lt("LF@%cond", "LF@%idx", &j);
        self.asm.jumpifeq(&done, "LF@%cond", &bool_symb(false));
        self.asm.getchar("LF@%ch", &s, "LF@%idx");
        self.asm.concat("LF@%res", "LF@%res", "LF@%ch");
        self.asm.add("LF@%idx", "LF@%idx", &int_symb(1));
        self.asm.jump(&head);
        self.asm.label(&done);
        self.asm.pushs("LF@%res");
        self.asm.popframe();
        self.asm.ret();

        self.asm.label(&nil);
        self.asm.pushs(nil_symb());
    }

    // ----------------------------------------------------------------
    // Statements
    // ----------------------------------------------------------------

    fn emit_block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.emit_statement(statement);
        }
    }

    fn emit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                for declarator in &declaration.declarators {
                    if let Some(initializer) = &declarator.initializer {
                        self.emit_expression(initializer);
                        let var = self.var(declarator.pattern.name.id);
                        self.asm.pops(&var);
                    }
                }
            }
            Statement::Assignment(assignment) => {
                self.emit_expression(&assignment.expression);
                let var = self.var(assignment.target.id);
                self.asm.pops(&var);
            }
            Statement::If(stmt) => self.emit_if(stmt),
            Statement::While(stmt) => self.emit_while(stmt),
            Statement::For(stmt) => self.emit_for(stmt),
            Statement::Return(stmt) => {
                if let Some(expression) = &stmt.expression {
                    self.emit_expression(expression);
                }
                self.asm.popframe();
                self.asm.ret();
            }
            Statement::Break(stmt) => {
                self.asm.jump(&loop_end_label(stmt.id));
            }
            Statement::Continue(stmt) => {
                self.asm.jump(&loop_next_label(stmt.id));
            }
            Statement::Expression(stmt) => {
                self.emit_expression(&stmt.expression);
                self.asm.clears();
            }
            Statement::FunctionDeclaration(_) => {
                // Emitted separately after the main body.
            }
        }
    }

    /// Evaluates a test: either leaves the condition's falseness as a
    /// jump to `on_false`, or performs the optional binding.
    fn emit_test(&mut self, test: &Test, on_false: &str) {
        match test {
            Test::Expression(expression) => {
                self.emit_expression(expression);
                self.asm.pushs(&bool_symb(true));
                self.asm.jumpifneqs(on_false);
            }
            Test::OptionalBinding(binding) => {
                let shadow = self.var(binding.name.id);
                let outer = self.var(binding.from_id);
                self.asm.move_symb(&shadow, &outer);
                self.asm.jumpifeq(on_false, &shadow, nil_symb());
            }
        }
    }

    fn emit_if(&mut self, stmt: &IfStatement) {
        let else_label = format!("$if_{}_else", stmt.id);
        let end_label = format!("$if_{}_end", stmt.id);

        self.emit_test(&stmt.test, &else_label);
        self.emit_block(&stmt.body);
        self.asm.jump(&end_label);
        self.asm.label(&else_label);

        match stmt.alternate.as_deref() {
            Some(ElseClause::Block(block)) => self.emit_block(block),
            Some(ElseClause::If(nested)) => self.emit_if(nested),
            None => {}
        }

        self.asm.label(&end_label);
    }

    fn emit_while(&mut self, stmt: &WhileStatement) {
        let next = loop_next_label(stmt.id);
        let end = loop_end_label(stmt.id);

        self.asm.label(&next);
        self.emit_test(&stmt.test, &end);
        self.emit_block(&stmt.body);
        self.asm.jump(&next);
        self.asm.label(&end);
    }

    fn emit_for(&mut self, stmt: &ForStatement) {
        let iterator = self.var(stmt.iterator.id);
        let end_bound = self.var(stmt.range.end_id);
        let head = format!("$loop_{}_head", stmt.id);
        let next = loop_next_label(stmt.id);
        let end = loop_end_label(stmt.id);

        self.emit_expression(&stmt.range.start);
        self.asm.pops(&iterator);
        self.emit_expression(&stmt.range.end);
        self.asm.pops(&end_bound);

        self.asm.label(&head);
        self.asm.pushs(&iterator);
        self.asm.pushs(&end_bound);
        match stmt.range.operator {
            OperatorType::Range => {
                // exit once iterator > end
                self.asm.gts();
                self.asm.pushs(&bool_symb(true));
                self.asm.jumpifeqs(&end);
            }
            _ => {
                // half-open: exit once iterator >= end
                self.asm.lts();
                self.asm.pushs(&bool_symb(false));
                self.asm.jumpifeqs(&end);
            }
        }

        self.emit_block(&stmt.body);

        self.asm.label(&next);
        self.asm.add(&iterator, &iterator, &int_symb(1));
        self.asm.jump(&head);
        self.asm.label(&end);
    }

    // ----------------------------------------------------------------
    // Expressions
    // ----------------------------------------------------------------

    /// Evaluates an expression, leaving exactly one value on the data
    /// stack (nil for Void-returning calls).
    fn emit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(literal) => {
                let symb = match &literal.value {
                    LiteralValue::Nil => nil_symb().to_string(),
                    LiteralValue::Integer(value) => int_symb(*value),
                    LiteralValue::Floating(value) => float_symb(*value),
                    LiteralValue::Boolean(value) => bool_symb(*value),
                    LiteralValue::String(value) => string_symb(value),
                };
                self.asm.pushs(&symb);
            }
            Expression::Identifier(identifier) => {
                let var = self.var(identifier.id);
                self.asm.pushs(&var);
            }
            Expression::Unary(unary) => match unary.operator {
                OperatorType::Not => {
                    self.emit_expression(&unary.argument);
                    self.asm.nots();
                }
                _ => {
                    // Unwrap is a no-op on the value stack.
                    self.emit_expression(&unary.argument);
                }
            },
            Expression::Binary(binary) => self.emit_binary(binary),
            Expression::FunctionCall(call) => self.emit_call(call),
            Expression::Interpolation(interpolation) => self.emit_interpolation(interpolation),
        }
    }

    fn emit_binary(&mut self, binary: &ifjc_par::ast::BinaryExpression) {
        let left_ty = self.expr_type(&binary.left);
        let right_ty = self.expr_type(&binary.right);

        // An Int literal paired with a Double operand was accepted by
        // the analyser without rewriting; materialize the widening.
        let widen_left = left_ty.primitive == Primitive::Int
            && right_ty.primitive == Primitive::Double;
        let widen_right = right_ty.primitive == Primitive::Int
            && left_ty.primitive == Primitive::Double;

        if binary.operator == OperatorType::NullCoalescing {
            let else_label = self.fresh_label("coalesce_rhs");
            let end_label = self.fresh_label("coalesce_end");

            self.emit_expression(&binary.left);
            self.asm.pops("GF@%tmp1");
            self.asm.jumpifeq(&else_label, "GF@%tmp1", nil_symb());
            self.asm.pushs("GF@%tmp1");
            self.asm.jump(&end_label);
            self.asm.label(&else_label);
            self.emit_expression(&binary.right);
            self.asm.label(&end_label);
            return;
        }

        self.emit_expression(&binary.left);
        if widen_left {
            self.asm.int2floats();
        }
        self.emit_expression(&binary.right);
        if widen_right {
            self.asm.int2floats();
        }

        match binary.operator {
            OperatorType::Plus => {
                if binary.ty.primitive == Primitive::String {
                    self.asm.pops("GF@%tmp2");
                    self.asm.pops("GF@%tmp1");
                    self.asm.concat("GF@%tmp1", "GF@%tmp1", "GF@%tmp2");
                    self.asm.pushs("GF@%tmp1");
                } else {
                    self.asm.adds();
                }
            }
            OperatorType::Minus => self.asm.subs(),
            OperatorType::Mul => self.asm.muls(),
            OperatorType::Div => {
                if binary.ty.primitive == Primitive::Int {
                    self.asm.idivs();
                } else {
                    self.asm.divs();
                }
            }
            OperatorType::Equal => self.asm.eqs(),
            OperatorType::NotEqual => {
                self.asm.eqs();
                self.asm.nots();
            }
            OperatorType::Less => self.asm.lts(),
            OperatorType::Greater => self.asm.gts(),
            OperatorType::LessEqual => {
                self.asm.gts();
                self.asm.nots();
            }
            OperatorType::GreaterEqual => {
                self.asm.lts();
                self.asm.nots();
            }
            OperatorType::And => self.asm.ands(),
            OperatorType::Or => self.asm.ors(),
            _ => {}
        }
    }

    fn emit_call(&mut self, call: &FunctionCall) {
        let builtin = self.analyser.builtin_by_id(call.name.id);

        if builtin == BuiltInFunction::Write {
            self.emit_write(&call.arguments);
            self.asm.pushs(nil_symb());
            return;
        }

        let Some(declaration) = self.analyser.function(call.name.id) else {
            return;
        };
        let declaration = declaration.clone();

        // Arguments evaluate before the frame is created, so nested
        // calls cannot clobber it.
        for argument in &call.arguments {
            self.emit_expression(&argument.expression);
        }

        self.asm.createframe();
        for parameter in &declaration.params {
            self.asm.defvar(&format!("TF@${}", parameter.decl_id));
        }
        for parameter in declaration.params.iter().rev() {
            self.asm.pops(&format!("TF@${}", parameter.decl_id));
        }
        self.asm.call(&function_label(declaration.id));

        if declaration.return_type.primitive == Primitive::Void {
            self.asm.pushs(nil_symb());
        }
    }

    /// Lowers `write`: each argument is stringified and written.
    fn emit_write(&mut self, arguments: &[Argument]) {
        for argument in arguments {
            let ty = self.expr_type(&argument.expression);
            self.emit_expression(&argument.expression);
            self.emit_stringify(ty);
            self.asm.pops("GF@%tmp1");
            self.asm.write("GF@%tmp1");
        }
    }

    /// Converts the stack top of the given type to its text form by
    /// calling the matching `__stringify__` overload.
    fn emit_stringify(&mut self, ty: ValueType) {
        if ty.primitive == Primitive::String && !ty.is_nullable {
            return;
        }
        if ty.primitive == Primitive::Nil {
            self.asm.pops("GF@%tmp1");
            self.asm.pushs(&string_symb("nil"));
            return;
        }

        let Some(overload) = self.stringify_overload(ty.primitive) else {
            return;
        };

        self.asm.createframe();
        let param = format!("TF@${}", overload.1);
        self.asm.defvar(&param);
        self.asm.pops(&param);
        self.asm.call(&function_label(overload.0));
    }

    /// Finds the `__stringify__` overload accepting the primitive,
    /// returning (function id, parameter declaration id).
    fn stringify_overload(&self, primitive: Primitive) -> Option<(NodeId, NodeId)> {
        let overloads = self.analyser.overloads_of("__stringify__")?;

        for &id in overloads {
            let function = self.analyser.function(id)?;
            if function.params.len() == 1 && function.params[0].ty.primitive == primitive {
                return Some((id, function.params[0].decl_id));
            }
        }

        None
    }

    fn emit_interpolation(&mut self, interpolation: &InterpolationExpression) {
        self.asm.pushs(&string_symb(&interpolation.strings[0]));

        for (index, expression) in interpolation.expressions.iter().enumerate() {
            let ty = self.expr_type(expression);
            self.emit_expression(expression);
            self.emit_stringify(ty);
            self.concat_stack_top();

            if let Some(piece) = interpolation.strings.get(index + 1) {
                self.asm.pushs(&string_symb(piece));
                self.concat_stack_top();
            }
        }
    }

    /// Concatenates the two topmost stack strings.
    fn concat_stack_top(&mut self) {
        self.asm.pops("GF@%tmp2");
        self.asm.pops("GF@%tmp1");
        self.asm.concat("GF@%tmp1", "GF@%tmp1", "GF@%tmp2");
        self.asm.pushs("GF@%tmp1");
    }

    // ----------------------------------------------------------------
    // Helpers
    // ----------------------------------------------------------------

    /// Renders a variable reference by declaration id, picking the
    /// frame from the declaration's globality.
    fn var(&self, id: NodeId) -> String {
        if self.analyser.is_declaration_global(id) {
            format!("GF@${}", id)
        } else {
            format!("LF@${}", id)
        }
    }

    fn fresh_label(&mut self, base: &str) -> String {
        self.label_counter += 1;
        format!("${}_{}", base, self.label_counter)
    }

    /// Resolved type of an annotated expression.
    fn expr_type(&self, expression: &Expression) -> ValueType {
        match expression {
            Expression::Literal(literal) => literal.ty,
            Expression::Identifier(identifier) => self
                .analyser
                .variable(identifier.id)
                .map(|v| v.ty)
                .unwrap_or(ValueType::UNKNOWN),
            Expression::FunctionCall(call) => self
                .analyser
                .function(call.name.id)
                .map(|f| f.return_type)
                .unwrap_or(ValueType::VOID),
            Expression::Binary(binary) => binary.ty,
            Expression::Unary(unary) => unary.ty,
            Expression::Interpolation(_) => ValueType::STRING,
        }
    }
}

fn function_label(id: NodeId) -> String {
    format!("$fn_{}", id)
}

fn loop_next_label(id: NodeId) -> String {
    format!("$loop_{}_next", id)
}

fn loop_end_label(id: NodeId) -> String {
    format!("$loop_{}_end", id)
}
