//! AST traversal that records global reads and writes.

use oxc_ast::ast::*;

use super::builtins::{self, BUNDLER_GLOBAL, IMPLICIT_ARGUMENTS};
use super::scope::{self, ScopeStack};
use crate::error::{Result, ScanError};
use crate::model::{Access, GlobalUsage};

/// Statement and expression nesting past this depth aborts the walk.
const MAX_NESTING_DEPTH: usize = 512;

/// The property side of a member access.
enum Key<'b, 'a> {
    Static(&'a str),
    Computed(&'b Expression<'a>),
}

impl<'b, 'a> Key<'b, 'a> {
    fn static_name(&self) -> Option<&'a str> {
        match self {
            Key::Static(name) => Some(*name),
            Key::Computed(Expression::StringLiteral(lit)) => Some(lit.value.as_str()),
            Key::Computed(_) => None,
        }
    }
}

/// Collects the global usage of one program.
///
/// The accumulator lives in the visitor and is returned by [`GlobalVisitor::analyze`],
/// so separate files never share state.
pub(super) struct GlobalVisitor<'a> {
    scopes: ScopeStack<'a>,
    usage: GlobalUsage,
    depth: usize,
    too_deep: bool,
}

impl<'a> GlobalVisitor<'a> {
    /// Fails with [`ScanError::ParseFailure`] when the program nests deeper
    /// than the walker's stack allows.
    pub fn analyze(program: &Program<'a>) -> Result<GlobalUsage> {
        let mut visitor = Self {
            scopes: ScopeStack::default(),
            usage: GlobalUsage::new(),
            depth: 0,
            too_deep: false,
        };

        let mut names = Vec::new();
        scope::body_names(&program.body, &mut names);
        visitor.scopes.push(names);
        visitor.visit_statements(&program.body);
        visitor.scopes.pop();

        if visitor.too_deep {
            return Err(ScanError::ParseFailure {
                path: "<source>".to_string(),
                message: format!("nesting too deep (limit {})", MAX_NESTING_DEPTH),
            });
        }
        Ok(visitor.usage)
    }

    fn enter(&mut self) -> bool {
        if self.too_deep {
            return false;
        }
        if self.depth >= MAX_NESTING_DEPTH {
            self.too_deep = true;
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn report(&mut self, name: &str, access: Access) {
        if access == Access::Read && builtins::is_ecma_global(name) {
            return;
        }
        self.usage.record(name, access);
    }

    /// A bare identifier in expression position.
    fn visit_reference(&mut self, name: &str, access: Access) {
        if self.scopes.is_bound(name) || builtins::is_global_alias(name) || name == IMPLICIT_ARGUMENTS {
            return;
        }
        self.report(name, access);
    }

    /// A resolved `a.b.c` chain. Only its root is reported.
    fn record_chain(&mut self, chain: &[&'a str], assigned: bool) {
        let mut chain = chain;
        if chain.len() >= 2 && chain[..2] == BUNDLER_GLOBAL {
            chain = &chain[2..];
        }

        // `window.x` is global even when an outer closure binds `x`.
        let mut must_be_global = false;
        while let Some(first) = chain.first() {
            if builtins::is_global_alias(first) && !self.scopes.is_bound(first) {
                chain = &chain[1..];
                must_be_global = true;
            } else {
                break;
            }
        }

        let Some(root) = chain.first() else {
            return;
        };
        if *root == IMPLICIT_ARGUMENTS || (!must_be_global && self.scopes.is_bound(root)) {
            return;
        }

        let access = if assigned && chain.len() == 1 {
            Access::ReadWrite
        } else {
            Access::Read
        };
        self.report(root, access);
    }

    fn visit_member_access(&mut self, object: &Expression<'a>, key: Key<'_, 'a>, assigned: bool) {
        match static_chain(object, &key) {
            Some(chain) => self.record_chain(&chain, assigned),
            None => {
                self.visit_expression(object);
                if let Key::Computed(expr) = key {
                    self.visit_expression(expr);
                }
            }
        }
    }

    fn visit_static_member(&mut self, member: &StaticMemberExpression<'a>, assigned: bool) {
        self.visit_member_access(&member.object, Key::Static(member.property.name.as_str()), assigned);
    }

    fn visit_computed_member(&mut self, member: &ComputedMemberExpression<'a>, assigned: bool) {
        self.visit_member_access(&member.object, Key::Computed(&member.expression), assigned);
    }

    fn visit_statements(&mut self, statements: &[Statement<'a>]) {
        for statement in statements {
            self.visit_statement(statement);
        }
    }

    fn visit_block(&mut self, statements: &[Statement<'a>]) {
        let mut names = Vec::new();
        scope::lexical_names(statements, &mut names);
        self.scopes.push(names);
        self.visit_statements(statements);
        self.scopes.pop();
    }

    fn visit_statement(&mut self, statement: &Statement<'a>) {
        if self.enter() {
            self.walk_statement(statement);
            self.leave();
        }
    }

    fn walk_statement(&mut self, statement: &Statement<'a>) {
        match statement {
            Statement::BlockStatement(block) => self.visit_block(&block.body),
            Statement::ExpressionStatement(stmt) => self.visit_expression(&stmt.expression),
            Statement::VariableDeclaration(decl) => self.visit_variable_declaration(decl),
            Statement::FunctionDeclaration(func) => self.visit_function(func, false),
            Statement::ClassDeclaration(class) => self.visit_class(class),
            Statement::IfStatement(stmt) => {
                self.visit_expression(&stmt.test);
                self.visit_statement(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.visit_statement(alternate);
                }
            }
            Statement::ForStatement(stmt) => {
                let names = match &stmt.init {
                    Some(ForStatementInit::VariableDeclaration(decl)) => scope::for_head_names(decl),
                    _ => Vec::new(),
                };
                self.scopes.push(names);
                match &stmt.init {
                    Some(ForStatementInit::VariableDeclaration(decl)) => self.visit_variable_declaration(decl),
                    Some(init) => {
                        if let Some(expr) = init.as_expression() {
                            self.visit_expression(expr);
                        }
                    }
                    None => {}
                }
                if let Some(test) = &stmt.test {
                    self.visit_expression(test);
                }
                if let Some(update) = &stmt.update {
                    self.visit_expression(update);
                }
                self.visit_statement(&stmt.body);
                self.scopes.pop();
            }
            Statement::ForInStatement(stmt) => {
                self.visit_for_each(&stmt.left, &stmt.right, &stmt.body);
            }
            Statement::ForOfStatement(stmt) => {
                self.visit_for_each(&stmt.left, &stmt.right, &stmt.body);
            }
            Statement::WhileStatement(stmt) => {
                self.visit_expression(&stmt.test);
                self.visit_statement(&stmt.body);
            }
            Statement::DoWhileStatement(stmt) => {
                self.visit_statement(&stmt.body);
                self.visit_expression(&stmt.test);
            }
            Statement::ReturnStatement(stmt) => {
                if let Some(argument) = &stmt.argument {
                    self.visit_expression(argument);
                }
            }
            Statement::ThrowStatement(stmt) => self.visit_expression(&stmt.argument),
            Statement::TryStatement(stmt) => {
                self.visit_block(&stmt.block.body);
                if let Some(handler) = &stmt.handler {
                    let mut names = Vec::new();
                    if let Some(param) = &handler.param {
                        scope::pattern_names(&param.pattern, &mut names);
                    }
                    self.scopes.push(names);
                    if let Some(param) = &handler.param {
                        self.visit_binding_pattern(&param.pattern);
                    }
                    self.visit_block(&handler.body.body);
                    self.scopes.pop();
                }
                if let Some(finalizer) = &stmt.finalizer {
                    self.visit_block(&finalizer.body);
                }
            }
            Statement::SwitchStatement(stmt) => {
                self.visit_expression(&stmt.discriminant);
                let mut names = Vec::new();
                for case in &stmt.cases {
                    scope::lexical_names(&case.consequent, &mut names);
                }
                self.scopes.push(names);
                for case in &stmt.cases {
                    if let Some(test) = &case.test {
                        self.visit_expression(test);
                    }
                    self.visit_statements(&case.consequent);
                }
                self.scopes.pop();
            }
            Statement::LabeledStatement(stmt) => self.visit_statement(&stmt.body),
            Statement::WithStatement(stmt) => {
                self.visit_expression(&stmt.object);
                self.visit_statement(&stmt.body);
            }
            Statement::ExportNamedDeclaration(export) => {
                if let Some(declaration) = &export.declaration {
                    self.visit_declaration(declaration);
                }
                if export.source.is_none() {
                    for specifier in &export.specifiers {
                        if let ModuleExportName::IdentifierReference(ident) = &specifier.local {
                            self.visit_reference(ident.name.as_str(), Access::Read);
                        }
                    }
                }
            }
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => self.visit_function(func, false),
                ExportDefaultDeclarationKind::ClassDeclaration(class) => self.visit_class(class),
                other => {
                    if let Some(expr) = other.as_expression() {
                        self.visit_expression(expr);
                    }
                }
            },
            // Imports only bind; labels, jumps and type-only declarations reference nothing.
            _ => {}
        }
    }

    fn visit_declaration(&mut self, declaration: &Declaration<'a>) {
        match declaration {
            Declaration::VariableDeclaration(decl) => self.visit_variable_declaration(decl),
            Declaration::FunctionDeclaration(func) => self.visit_function(func, false),
            Declaration::ClassDeclaration(class) => self.visit_class(class),
            _ => {}
        }
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        for declarator in &decl.declarations {
            self.visit_binding_pattern(&declarator.id);
            if let Some(init) = &declarator.init {
                self.visit_expression(init);
            }
        }
    }

    fn visit_for_each(&mut self, left: &ForStatementLeft<'a>, right: &Expression<'a>, body: &Statement<'a>) {
        let names = match left {
            ForStatementLeft::VariableDeclaration(decl) => scope::for_head_names(decl),
            _ => Vec::new(),
        };
        self.scopes.push(names);
        match left {
            ForStatementLeft::VariableDeclaration(decl) => self.visit_variable_declaration(decl),
            other => {
                if let Some(target) = other.as_assignment_target() {
                    self.visit_assignment_target(target, false);
                }
            }
        }
        self.visit_expression(right);
        self.visit_statement(body);
        self.scopes.pop();
    }

    /// Walks default values and computed keys; the bound names themselves are
    /// already in scope.
    fn visit_binding_pattern(&mut self, pattern: &BindingPattern<'a>) {
        match &pattern.kind {
            BindingPatternKind::BindingIdentifier(_) => {}
            BindingPatternKind::ObjectPattern(object) => {
                for property in &object.properties {
                    if property.computed {
                        self.visit_property_key(&property.key);
                    }
                    self.visit_binding_pattern(&property.value);
                }
                if let Some(rest) = &object.rest {
                    self.visit_binding_pattern(&rest.argument);
                }
            }
            BindingPatternKind::ArrayPattern(array) => {
                for element in array.elements.iter().flatten() {
                    self.visit_binding_pattern(element);
                }
                if let Some(rest) = &array.rest {
                    self.visit_binding_pattern(&rest.argument);
                }
            }
            BindingPatternKind::AssignmentPattern(assign) => {
                self.visit_binding_pattern(&assign.left);
                self.visit_expression(&assign.right);
            }
        }
    }

    fn visit_parameters(&mut self, params: &FormalParameters<'a>) {
        for param in &params.items {
            self.visit_binding_pattern(&param.pattern);
        }
        if let Some(rest) = &params.rest {
            self.visit_binding_pattern(&rest.argument);
        }
    }

    /// `own_name` binds a function expression's name inside its own body.
    fn visit_function(&mut self, func: &Function<'a>, own_name: bool) {
        let mut names = Vec::new();
        if own_name {
            if let Some(id) = &func.id {
                names.push(id.name.as_str());
            }
        }
        scope::parameter_names(&func.params, &mut names);
        if let Some(body) = &func.body {
            scope::body_names(&body.statements, &mut names);
        }

        self.scopes.push(names);
        self.visit_parameters(&func.params);
        if let Some(body) = &func.body {
            self.visit_statements(&body.statements);
        }
        self.scopes.pop();
    }

    fn visit_arrow(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        let mut names = Vec::new();
        scope::parameter_names(&arrow.params, &mut names);
        scope::body_names(&arrow.body.statements, &mut names);

        self.scopes.push(names);
        self.visit_parameters(&arrow.params);
        self.visit_statements(&arrow.body.statements);
        self.scopes.pop();
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        let names = class.id.iter().map(|id| id.name.as_str()).collect();
        self.scopes.push(names);

        if let Some(super_class) = &class.super_class {
            self.visit_expression(super_class);
        }
        for element in &class.body.body {
            match element {
                ClassElement::MethodDefinition(method) => {
                    if method.computed {
                        self.visit_property_key(&method.key);
                    }
                    self.visit_function(&method.value, false);
                }
                ClassElement::PropertyDefinition(property) => {
                    if property.computed {
                        self.visit_property_key(&property.key);
                    }
                    if let Some(value) = &property.value {
                        self.visit_expression(value);
                    }
                }
                ClassElement::AccessorProperty(property) => {
                    if property.computed {
                        self.visit_property_key(&property.key);
                    }
                    if let Some(value) = &property.value {
                        self.visit_expression(value);
                    }
                }
                ClassElement::StaticBlock(block) => {
                    let mut names = Vec::new();
                    scope::body_names(&block.body, &mut names);
                    self.scopes.push(names);
                    self.visit_statements(&block.body);
                    self.scopes.pop();
                }
                _ => {}
            }
        }

        self.scopes.pop();
    }

    fn visit_property_key(&mut self, key: &PropertyKey<'a>) {
        if let Some(expr) = key.as_expression() {
            self.visit_expression(expr);
        }
    }

    fn visit_assignment(&mut self, assign: &AssignmentExpression<'a>) {
        self.visit_assignment_target(&assign.left, true);
        self.visit_expression(&assign.right);
    }

    /// `direct` is true only for the immediate left side of `=`; targets nested
    /// in destructuring patterns are reads.
    fn visit_assignment_target(&mut self, target: &AssignmentTarget<'a>, direct: bool) {
        let access = if direct { Access::ReadWrite } else { Access::Read };
        match target {
            AssignmentTarget::AssignmentTargetIdentifier(ident) => {
                self.visit_reference(ident.name.as_str(), access);
            }
            AssignmentTarget::StaticMemberExpression(member) => self.visit_static_member(member, direct),
            AssignmentTarget::ComputedMemberExpression(member) => self.visit_computed_member(member, direct),
            AssignmentTarget::PrivateFieldExpression(member) => self.visit_expression(&member.object),
            AssignmentTarget::ArrayAssignmentTarget(array) => {
                for element in array.elements.iter().flatten() {
                    self.visit_assignment_target_maybe_default(element);
                }
                if let Some(rest) = &array.rest {
                    self.visit_assignment_target(&rest.target, false);
                }
            }
            AssignmentTarget::ObjectAssignmentTarget(object) => {
                for property in &object.properties {
                    match property {
                        AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(prop) => {
                            self.visit_reference(prop.binding.name.as_str(), Access::Read);
                            if let Some(init) = &prop.init {
                                self.visit_expression(init);
                            }
                        }
                        AssignmentTargetProperty::AssignmentTargetPropertyProperty(prop) => {
                            if prop.computed {
                                self.visit_property_key(&prop.name);
                            }
                            self.visit_assignment_target_maybe_default(&prop.binding);
                        }
                    }
                }
                if let Some(rest) = &object.rest {
                    self.visit_assignment_target(&rest.target, false);
                }
            }
            // TypeScript wrappers never appear in published JavaScript.
            _ => {}
        }
    }

    fn visit_assignment_target_maybe_default(&mut self, target: &AssignmentTargetMaybeDefault<'a>) {
        match target {
            AssignmentTargetMaybeDefault::AssignmentTargetWithDefault(with_default) => {
                self.visit_assignment_target(&with_default.binding, false);
                self.visit_expression(&with_default.init);
            }
            other => {
                if let Some(target) = other.as_assignment_target() {
                    self.visit_assignment_target(target, false);
                }
            }
        }
    }

    /// `x++` reads `x` for our purposes; only `=`-style assignment writes.
    fn visit_simple_target(&mut self, target: &SimpleAssignmentTarget<'a>) {
        match target {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) => {
                self.visit_reference(ident.name.as_str(), Access::Read);
            }
            SimpleAssignmentTarget::StaticMemberExpression(member) => self.visit_static_member(member, false),
            SimpleAssignmentTarget::ComputedMemberExpression(member) => self.visit_computed_member(member, false),
            SimpleAssignmentTarget::PrivateFieldExpression(member) => self.visit_expression(&member.object),
            _ => {}
        }
    }

    fn visit_call(&mut self, call: &CallExpression<'a>) {
        self.visit_expression(&call.callee);
        self.visit_arguments(&call.arguments);
    }

    fn visit_arguments(&mut self, arguments: &[Argument<'a>]) {
        for argument in arguments {
            match argument {
                Argument::SpreadElement(spread) => self.visit_expression(&spread.argument),
                other => {
                    if let Some(expr) = other.as_expression() {
                        self.visit_expression(expr);
                    }
                }
            }
        }
    }

    fn visit_chain_element(&mut self, element: &ChainElement<'a>) {
        match element {
            ChainElement::CallExpression(call) => self.visit_call(call),
            ChainElement::TSNonNullExpression(expr) => self.visit_expression(&expr.expression),
            ChainElement::StaticMemberExpression(member) => self.visit_static_member(member, false),
            ChainElement::ComputedMemberExpression(member) => self.visit_computed_member(member, false),
            ChainElement::PrivateFieldExpression(member) => self.visit_expression(&member.object),
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn visit_expression(&mut self, expr: &Expression<'a>) {
        if self.enter() {
            self.walk_expression(expr);
            self.leave();
        }
    }

    /// Visits `a + b + c ...` left to right without recursing down the left spine.
    /// Minified bundles contain chains tens of thousands of terms long.
    fn visit_operator_chain(&mut self, expr: &Expression<'a>) {
        let mut rights = Vec::new();
        let mut current = expr;
        loop {
            match current {
                Expression::BinaryExpression(binary) => {
                    rights.push(&binary.right);
                    current = &binary.left;
                }
                Expression::LogicalExpression(logical) => {
                    rights.push(&logical.right);
                    current = &logical.left;
                }
                _ => break,
            }
        }

        self.visit_expression(current);
        for right in rights.into_iter().rev() {
            self.visit_expression(right);
        }
    }

    fn walk_expression(&mut self, expr: &Expression<'a>) {
        match expr {
            Expression::Identifier(ident) => self.visit_reference(ident.name.as_str(), Access::Read),
            Expression::StaticMemberExpression(member) => self.visit_static_member(member, false),
            Expression::ComputedMemberExpression(member) => self.visit_computed_member(member, false),
            Expression::PrivateFieldExpression(member) => self.visit_expression(&member.object),
            Expression::AssignmentExpression(assign) => self.visit_assignment(assign),
            Expression::CallExpression(call) => self.visit_call(call),
            Expression::NewExpression(new) => {
                self.visit_expression(&new.callee);
                self.visit_arguments(&new.arguments);
            }
            Expression::ChainExpression(chain) => self.visit_chain_element(&chain.expression),
            Expression::FunctionExpression(func) => self.visit_function(func, true),
            Expression::ArrowFunctionExpression(arrow) => self.visit_arrow(arrow),
            Expression::ClassExpression(class) => self.visit_class(class),
            Expression::ArrayExpression(array) => {
                for element in &array.elements {
                    match element {
                        ArrayExpressionElement::SpreadElement(spread) => self.visit_expression(&spread.argument),
                        other => {
                            if let Some(expr) = other.as_expression() {
                                self.visit_expression(expr);
                            }
                        }
                    }
                }
            }
            Expression::ObjectExpression(object) => {
                for property in &object.properties {
                    match property {
                        ObjectPropertyKind::ObjectProperty(prop) => {
                            if prop.computed {
                                self.visit_property_key(&prop.key);
                            }
                            self.visit_expression(&prop.value);
                        }
                        ObjectPropertyKind::SpreadProperty(spread) => self.visit_expression(&spread.argument),
                    }
                }
            }
            Expression::TemplateLiteral(template) => {
                for expr in &template.expressions {
                    self.visit_expression(expr);
                }
            }
            Expression::TaggedTemplateExpression(tagged) => {
                self.visit_expression(&tagged.tag);
                for expr in &tagged.quasi.expressions {
                    self.visit_expression(expr);
                }
            }
            Expression::BinaryExpression(_) | Expression::LogicalExpression(_) => {
                self.visit_operator_chain(expr);
            }
            Expression::ConditionalExpression(cond) => {
                self.visit_expression(&cond.test);
                self.visit_expression(&cond.consequent);
                self.visit_expression(&cond.alternate);
            }
            Expression::SequenceExpression(sequence) => {
                for expr in &sequence.expressions {
                    self.visit_expression(expr);
                }
            }
            Expression::UnaryExpression(unary) => self.visit_expression(&unary.argument),
            Expression::UpdateExpression(update) => self.visit_simple_target(&update.argument),
            Expression::AwaitExpression(await_expr) => self.visit_expression(&await_expr.argument),
            Expression::YieldExpression(yield_expr) => {
                if let Some(argument) = &yield_expr.argument {
                    self.visit_expression(argument);
                }
            }
            Expression::ParenthesizedExpression(paren) => self.visit_expression(&paren.expression),
            Expression::ImportExpression(import) => self.visit_expression(&import.source),
            Expression::PrivateInExpression(private_in) => self.visit_expression(&private_in.right),
            Expression::TSAsExpression(ts) => self.visit_expression(&ts.expression),
            Expression::TSSatisfiesExpression(ts) => self.visit_expression(&ts.expression),
            Expression::TSNonNullExpression(ts) => self.visit_expression(&ts.expression),
            Expression::TSTypeAssertion(ts) => self.visit_expression(&ts.expression),
            Expression::TSInstantiationExpression(ts) => self.visit_expression(&ts.expression),
            // Literals, `this`, `super` and meta properties reference no bindings.
            _ => {}
        }
    }
}

/// Resolves `object.key` to a chain of static names rooted at an identifier.
///
/// Returns `None` as soon as a dynamic key or a non-identifier root shows up.
fn static_chain<'a>(object: &Expression<'a>, key: &Key<'_, 'a>) -> Option<Vec<&'a str>> {
    let mut chain = vec![key.static_name()?];
    let mut current = object;
    loop {
        match current {
            Expression::Identifier(ident) => {
                chain.push(ident.name.as_str());
                break;
            }
            Expression::StaticMemberExpression(member) => {
                chain.push(member.property.name.as_str());
                current = &member.object;
            }
            Expression::ComputedMemberExpression(member) => match &member.expression {
                Expression::StringLiteral(lit) => {
                    chain.push(lit.value.as_str());
                    current = &member.object;
                }
                _ => return None,
            },
            _ => return None,
        }
    }
    chain.reverse();
    Some(chain)
}
