//! Component function discovery.
//!
//! A component function is any top-level function whose body contains a
//! `template`-tagged literal. Discovery is permissive on purpose: a
//! function with two template tags or a tag buried in a nested closure is
//! still discovered, so the validator can report the misuse against a
//! named component instead of silently skipping it.

use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, Declaration, ExportDefaultDeclarationKind,
    Expression, Function, FunctionBody, Program, Statement,
};
use oxc_span::GetSpan;

use crate::walk::walk_statement;

/// The function-like node backing a discovered component.
#[derive(Debug, Clone, Copy)]
pub enum ComponentFnNode<'a> {
    Function(&'a Function<'a>),
    Arrow(&'a ArrowFunctionExpression<'a>),
}

impl<'a> ComponentFnNode<'a> {
    pub fn body(&self) -> Option<&'a FunctionBody<'a>> {
        match self {
            Self::Function(func) => func.body.as_deref(),
            Self::Arrow(arrow) => Some(&arrow.body),
        }
    }

    pub fn is_async(&self) -> bool {
        match self {
            Self::Function(func) => func.r#async,
            Self::Arrow(arrow) => arrow.r#async,
        }
    }

    /// Byte range of the function expression itself (not the enclosing
    /// statement).
    pub fn span(&self) -> (usize, usize) {
        let span = match self {
            Self::Function(func) => func.span,
            Self::Arrow(arrow) => arrow.span,
        };
        (span.start as usize, span.end as usize)
    }

    pub fn function(&self) -> Option<&'a Function<'a>> {
        match self {
            Self::Function(func) => Some(func),
            Self::Arrow(_) => None,
        }
    }

    pub fn params(&self) -> &'a oxc_ast::ast::FormalParameters<'a> {
        match self {
            Self::Function(func) => &func.params,
            Self::Arrow(arrow) => &arrow.params,
        }
    }
}

/// One discovered component function, still tied to the parse tree.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveredComponent<'a> {
    pub name: &'a str,
    pub node: ComponentFnNode<'a>,
    pub is_exported: bool,
    pub is_default_export: bool,
    /// Byte range of the whole enclosing statement, `export` included
    pub stmt_start: usize,
    pub stmt_end: usize,
}

/// One `template`-tagged literal inside a function body.
#[derive(Debug, Clone, Copy)]
pub struct TemplateTag {
    /// Byte range of the whole `template\`...\`` expression
    pub start: usize,
    pub end: usize,
    /// Byte range of the literal content, backticks excluded
    pub content_start: usize,
    pub content_end: usize,
    pub has_interpolation: bool,
    /// Index of the enclosing body statement
    pub stmt_index: usize,
}

/// Find every component function declared at the top level of a program.
pub fn find_component_functions<'a>(program: &'a Program<'a>) -> Vec<DiscoveredComponent<'a>> {
    let mut found = Vec::new();

    for stmt in program.body.iter() {
        let stmt_span = stmt.span();
        match stmt {
            Statement::FunctionDeclaration(func) => {
                collect_function(func, false, false, stmt_span, &mut found);
            }
            Statement::VariableDeclaration(decl) => {
                collect_declarators(decl, false, stmt_span, &mut found);
            }
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::FunctionDeclaration(func)) => {
                    collect_function(func, true, false, stmt_span, &mut found);
                }
                Some(Declaration::VariableDeclaration(decl)) => {
                    collect_declarators(decl, true, stmt_span, &mut found);
                }
                _ => {}
            },
            Statement::ExportDefaultDeclaration(export) => {
                if let ExportDefaultDeclarationKind::FunctionDeclaration(func) =
                    &export.declaration
                {
                    collect_function(func, true, true, stmt_span, &mut found);
                }
            }
            _ => {}
        }
    }

    found
}

fn collect_function<'a>(
    func: &'a Function<'a>,
    is_exported: bool,
    is_default_export: bool,
    stmt_span: oxc_span::Span,
    found: &mut Vec<DiscoveredComponent<'a>>,
) {
    let Some(id) = &func.id else {
        return;
    };
    let Some(body) = &func.body else {
        return;
    };
    if template_tags(body).is_empty() {
        return;
    }
    found.push(DiscoveredComponent {
        name: id.name.as_str(),
        node: ComponentFnNode::Function(func),
        is_exported,
        is_default_export,
        stmt_start: stmt_span.start as usize,
        stmt_end: stmt_span.end as usize,
    });
}

fn collect_declarators<'a>(
    decl: &'a oxc_ast::ast::VariableDeclaration<'a>,
    is_exported: bool,
    stmt_span: oxc_span::Span,
    found: &mut Vec<DiscoveredComponent<'a>>,
) {
    for declarator in decl.declarations.iter() {
        let BindingPattern::BindingIdentifier(id) = &declarator.id else {
            continue;
        };
        let node = match &declarator.init {
            Some(Expression::ArrowFunctionExpression(arrow)) => ComponentFnNode::Arrow(arrow),
            Some(Expression::FunctionExpression(func)) => ComponentFnNode::Function(func),
            _ => continue,
        };
        let Some(body) = node.body() else {
            continue;
        };
        if template_tags(body).is_empty() {
            continue;
        }
        found.push(DiscoveredComponent {
            name: id.name.as_str(),
            node,
            is_exported,
            is_default_export: false,
            stmt_start: stmt_span.start as usize,
            stmt_end: stmt_span.end as usize,
        });
    }
}

/// Collect every `template`-tagged literal in a function body, nested
/// closures included.
pub fn template_tags<'a>(body: &'a FunctionBody<'a>) -> Vec<TemplateTag> {
    let mut tags = Vec::new();
    for (stmt_index, stmt) in body.statements.iter().enumerate() {
        walk_statement(stmt, true, &mut |expr| {
            if let Expression::TaggedTemplateExpression(tagged) = expr {
                if let Expression::Identifier(tag) = &tagged.tag {
                    if tag.name == "template" {
                        let quasi_span = tagged.quasi.span;
                        tags.push(TemplateTag {
                            start: tagged.span.start as usize,
                            end: tagged.span.end as usize,
                            content_start: quasi_span.start as usize + 1,
                            content_end: quasi_span.end as usize - 1,
                            has_interpolation: !tagged.quasi.expressions.is_empty(),
                            stmt_index,
                        });
                    }
                }
            }
        });
    }
    tags
}
