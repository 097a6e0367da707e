//! Lexical scope tracking over the oxc AST.
//!
//! Each frame holds every name a scope binds, collected before the scope's
//! body is walked, so a reference that precedes its declaration (hoisting,
//! or the temporal dead zone of `let`) still resolves to the local binding.

use oxc_ast::ast::*;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub(super) struct ScopeStack<'a> {
    frames: Vec<HashSet<&'a str>>,
}

impl<'a> ScopeStack<'a> {
    pub fn push(&mut self, names: Vec<&'a str>) {
        self.frames.push(names.into_iter().collect());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name))
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

pub(super) fn pattern_names<'a>(pattern: &BindingPattern<'a>, out: &mut Vec<&'a str>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => out.push(ident.name.as_str()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in &object.properties {
                pattern_names(&property.value, out);
            }
            if let Some(rest) = &object.rest {
                pattern_names(&rest.argument, out);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                pattern_names(element, out);
            }
            if let Some(rest) = &array.rest {
                pattern_names(&rest.argument, out);
            }
        }
        BindingPatternKind::AssignmentPattern(assign) => pattern_names(&assign.left, out),
    }
}

pub(super) fn parameter_names<'a>(params: &FormalParameters<'a>, out: &mut Vec<&'a str>) {
    for param in &params.items {
        pattern_names(&param.pattern, out);
    }
    if let Some(rest) = &params.rest {
        pattern_names(&rest.argument, out);
    }
}

fn declaration_names<'a>(decl: &VariableDeclaration<'a>, out: &mut Vec<&'a str>) {
    for declarator in &decl.declarations {
        pattern_names(&declarator.id, out);
    }
}

fn is_var(decl: &VariableDeclaration<'_>) -> bool {
    matches!(decl.kind, VariableDeclarationKind::Var)
}

/// Names bound by `let`/`const`/`using` in a `for` head.
pub(super) fn for_head_names<'a>(decl: &VariableDeclaration<'a>) -> Vec<&'a str> {
    let mut names = Vec::new();
    if !is_var(decl) {
        declaration_names(decl, &mut names);
    }
    names
}

/// `var` and function declarations that hoist to the enclosing function or
/// program scope, including those nested in blocks and loop bodies.
pub(super) fn hoisted_names<'a>(statements: &[Statement<'a>], out: &mut Vec<&'a str>) {
    for statement in statements {
        hoisted_in_statement(statement, out);
    }
}

fn hoisted_in_statement<'a>(statement: &Statement<'a>, out: &mut Vec<&'a str>) {
    match statement {
        Statement::VariableDeclaration(decl) if is_var(decl) => declaration_names(decl, out),
        Statement::FunctionDeclaration(func) => {
            if let Some(id) = &func.id {
                out.push(id.name.as_str());
            }
        }
        Statement::BlockStatement(block) => hoisted_names(&block.body, out),
        Statement::IfStatement(stmt) => {
            hoisted_in_statement(&stmt.consequent, out);
            if let Some(alternate) = &stmt.alternate {
                hoisted_in_statement(alternate, out);
            }
        }
        Statement::ForStatement(stmt) => {
            if let Some(ForStatementInit::VariableDeclaration(decl)) = &stmt.init {
                if is_var(decl) {
                    declaration_names(decl, out);
                }
            }
            hoisted_in_statement(&stmt.body, out);
        }
        Statement::ForInStatement(stmt) => {
            if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
                if is_var(decl) {
                    declaration_names(decl, out);
                }
            }
            hoisted_in_statement(&stmt.body, out);
        }
        Statement::ForOfStatement(stmt) => {
            if let ForStatementLeft::VariableDeclaration(decl) = &stmt.left {
                if is_var(decl) {
                    declaration_names(decl, out);
                }
            }
            hoisted_in_statement(&stmt.body, out);
        }
        Statement::WhileStatement(stmt) => hoisted_in_statement(&stmt.body, out),
        Statement::DoWhileStatement(stmt) => hoisted_in_statement(&stmt.body, out),
        Statement::LabeledStatement(stmt) => hoisted_in_statement(&stmt.body, out),
        Statement::WithStatement(stmt) => hoisted_in_statement(&stmt.body, out),
        Statement::TryStatement(stmt) => {
            hoisted_names(&stmt.block.body, out);
            if let Some(handler) = &stmt.handler {
                hoisted_names(&handler.body.body, out);
            }
            if let Some(finalizer) = &stmt.finalizer {
                hoisted_names(&finalizer.body, out);
            }
        }
        Statement::SwitchStatement(stmt) => {
            for case in &stmt.cases {
                hoisted_names(&case.consequent, out);
            }
        }
        Statement::ExportNamedDeclaration(export) => match &export.declaration {
            Some(Declaration::VariableDeclaration(decl)) if is_var(decl) => declaration_names(decl, out),
            Some(Declaration::FunctionDeclaration(func)) => {
                if let Some(id) = &func.id {
                    out.push(id.name.as_str());
                }
            }
            _ => {}
        },
        _ => {}
    }
}

/// Block-scoped bindings declared directly in `statements`: `let`, `const`,
/// classes, functions and imports.
pub(super) fn lexical_names<'a>(statements: &[Statement<'a>], out: &mut Vec<&'a str>) {
    for statement in statements {
        match statement {
            Statement::VariableDeclaration(decl) if !is_var(decl) => declaration_names(decl, out),
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    out.push(id.name.as_str());
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    out.push(id.name.as_str());
                }
            }
            Statement::ImportDeclaration(import) => {
                for specifier in import.specifiers.iter().flatten() {
                    out.push(import_local(specifier));
                }
            }
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::VariableDeclaration(decl)) if !is_var(decl) => {
                    declaration_names(decl, out)
                }
                Some(Declaration::ClassDeclaration(class)) => {
                    if let Some(id) = &class.id {
                        out.push(id.name.as_str());
                    }
                }
                _ => {}
            },
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    if let Some(id) = &func.id {
                        out.push(id.name.as_str());
                    }
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        out.push(id.name.as_str());
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
}

fn import_local<'a>(specifier: &ImportDeclarationSpecifier<'a>) -> &'a str {
    match specifier {
        ImportDeclarationSpecifier::ImportSpecifier(spec) => spec.local.name.as_str(),
        ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => spec.local.name.as_str(),
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => spec.local.name.as_str(),
    }
}

/// Everything a function-like body binds at its top level.
pub(super) fn body_names<'a>(statements: &[Statement<'a>], out: &mut Vec<&'a str>) {
    hoisted_names(statements, out);
    lexical_names(statements, out);
}
