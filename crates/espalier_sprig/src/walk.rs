//! Recursive statement/expression walking.
//!
//! OXC gives us a typed tree without a generic visitor that fits our
//! borrow pattern, so walking is a plain recursive match, the same shape
//! for every consumer: the callback sees each expression pre-order, then
//! the walk descends. `enter_functions` controls whether the walk crosses
//! into nested function/arrow bodies (top-level-await collection must not).

use oxc_ast::ast::{
    ArrayExpressionElement, Expression, ForStatementInit, ObjectPropertyKind, Statement,
};

pub fn walk_statement<'a>(
    stmt: &'a Statement<'a>,
    enter_functions: bool,
    f: &mut dyn FnMut(&'a Expression<'a>),
) {
    match stmt {
        Statement::VariableDeclaration(decl) => {
            for declarator in decl.declarations.iter() {
                if let Some(init) = &declarator.init {
                    walk_expression(init, enter_functions, f);
                }
            }
        }
        Statement::ExpressionStatement(expr_stmt) => {
            walk_expression(&expr_stmt.expression, enter_functions, f);
        }
        Statement::ReturnStatement(ret) => {
            if let Some(arg) = &ret.argument {
                walk_expression(arg, enter_functions, f);
            }
        }
        Statement::IfStatement(if_stmt) => {
            walk_expression(&if_stmt.test, enter_functions, f);
            walk_statement(&if_stmt.consequent, enter_functions, f);
            if let Some(alt) = &if_stmt.alternate {
                walk_statement(alt, enter_functions, f);
            }
        }
        Statement::BlockStatement(block) => {
            for inner in block.body.iter() {
                walk_statement(inner, enter_functions, f);
            }
        }
        Statement::FunctionDeclaration(func) => {
            if enter_functions {
                if let Some(body) = &func.body {
                    for inner in body.statements.iter() {
                        walk_statement(inner, enter_functions, f);
                    }
                }
            }
        }
        Statement::ForStatement(for_stmt) => {
            if let Some(init) = &for_stmt.init {
                match init {
                    ForStatementInit::VariableDeclaration(decl) => {
                        for declarator in decl.declarations.iter() {
                            if let Some(init_expr) = &declarator.init {
                                walk_expression(init_expr, enter_functions, f);
                            }
                        }
                    }
                    _ => {
                        if let Some(expr) = init.as_expression() {
                            walk_expression(expr, enter_functions, f);
                        }
                    }
                }
            }
            if let Some(test) = &for_stmt.test {
                walk_expression(test, enter_functions, f);
            }
            if let Some(update) = &for_stmt.update {
                walk_expression(update, enter_functions, f);
            }
            walk_statement(&for_stmt.body, enter_functions, f);
        }
        Statement::ForInStatement(for_in) => {
            walk_expression(&for_in.right, enter_functions, f);
            walk_statement(&for_in.body, enter_functions, f);
        }
        Statement::ForOfStatement(for_of) => {
            walk_expression(&for_of.right, enter_functions, f);
            walk_statement(&for_of.body, enter_functions, f);
        }
        Statement::WhileStatement(while_stmt) => {
            walk_expression(&while_stmt.test, enter_functions, f);
            walk_statement(&while_stmt.body, enter_functions, f);
        }
        Statement::DoWhileStatement(do_while) => {
            walk_statement(&do_while.body, enter_functions, f);
            walk_expression(&do_while.test, enter_functions, f);
        }
        Statement::TryStatement(try_stmt) => {
            for inner in try_stmt.block.body.iter() {
                walk_statement(inner, enter_functions, f);
            }
            if let Some(handler) = &try_stmt.handler {
                for inner in handler.body.body.iter() {
                    walk_statement(inner, enter_functions, f);
                }
            }
            if let Some(finalizer) = &try_stmt.finalizer {
                for inner in finalizer.body.iter() {
                    walk_statement(inner, enter_functions, f);
                }
            }
        }
        Statement::SwitchStatement(switch) => {
            walk_expression(&switch.discriminant, enter_functions, f);
            for case in switch.cases.iter() {
                if let Some(test) = &case.test {
                    walk_expression(test, enter_functions, f);
                }
                for inner in case.consequent.iter() {
                    walk_statement(inner, enter_functions, f);
                }
            }
        }
        Statement::ThrowStatement(throw) => {
            walk_expression(&throw.argument, enter_functions, f);
        }
        Statement::LabeledStatement(labeled) => {
            walk_statement(&labeled.body, enter_functions, f);
        }
        _ => {}
    }
}

pub fn walk_expression<'a>(
    expr: &'a Expression<'a>,
    enter_functions: bool,
    f: &mut dyn FnMut(&'a Expression<'a>),
) {
    f(expr);

    match expr {
        Expression::CallExpression(call) => {
            for arg in call.arguments.iter() {
                if let Some(arg_expr) = arg.as_expression() {
                    walk_expression(arg_expr, enter_functions, f);
                }
            }
            walk_expression(&call.callee, enter_functions, f);
        }
        Expression::NewExpression(new_expr) => {
            for arg in new_expr.arguments.iter() {
                if let Some(arg_expr) = arg.as_expression() {
                    walk_expression(arg_expr, enter_functions, f);
                }
            }
            walk_expression(&new_expr.callee, enter_functions, f);
        }
        Expression::ArrowFunctionExpression(arrow) => {
            if enter_functions {
                for inner in arrow.body.statements.iter() {
                    walk_statement(inner, enter_functions, f);
                }
            }
        }
        Expression::FunctionExpression(func) => {
            if enter_functions {
                if let Some(body) = &func.body {
                    for inner in body.statements.iter() {
                        walk_statement(inner, enter_functions, f);
                    }
                }
            }
        }
        Expression::BinaryExpression(bin) => {
            walk_expression(&bin.left, enter_functions, f);
            walk_expression(&bin.right, enter_functions, f);
        }
        Expression::LogicalExpression(logical) => {
            walk_expression(&logical.left, enter_functions, f);
            walk_expression(&logical.right, enter_functions, f);
        }
        Expression::UnaryExpression(unary) => {
            walk_expression(&unary.argument, enter_functions, f);
        }
        Expression::AwaitExpression(await_expr) => {
            walk_expression(&await_expr.argument, enter_functions, f);
        }
        Expression::AssignmentExpression(assign) => {
            walk_expression(&assign.right, enter_functions, f);
        }
        Expression::ConditionalExpression(cond) => {
            walk_expression(&cond.test, enter_functions, f);
            walk_expression(&cond.consequent, enter_functions, f);
            walk_expression(&cond.alternate, enter_functions, f);
        }
        Expression::SequenceExpression(seq) => {
            for inner in seq.expressions.iter() {
                walk_expression(inner, enter_functions, f);
            }
        }
        Expression::ParenthesizedExpression(paren) => {
            walk_expression(&paren.expression, enter_functions, f);
        }
        Expression::TemplateLiteral(template) => {
            for inner in template.expressions.iter() {
                walk_expression(inner, enter_functions, f);
            }
        }
        Expression::TaggedTemplateExpression(tagged) => {
            walk_expression(&tagged.tag, enter_functions, f);
            for inner in tagged.quasi.expressions.iter() {
                walk_expression(inner, enter_functions, f);
            }
        }
        Expression::ObjectExpression(obj) => {
            for prop in obj.properties.iter() {
                match prop {
                    ObjectPropertyKind::ObjectProperty(p) => {
                        walk_expression(&p.value, enter_functions, f);
                    }
                    ObjectPropertyKind::SpreadProperty(spread) => {
                        walk_expression(&spread.argument, enter_functions, f);
                    }
                }
            }
        }
        Expression::ArrayExpression(arr) => {
            for elem in arr.elements.iter() {
                match elem {
                    ArrayExpressionElement::SpreadElement(spread) => {
                        walk_expression(&spread.argument, enter_functions, f);
                    }
                    ArrayExpressionElement::Elision(_) => {}
                    _ => {
                        if let Some(elem_expr) = elem.as_expression() {
                            walk_expression(elem_expr, enter_functions, f);
                        }
                    }
                }
            }
        }
        _ if expr.is_member_expression() => {
            if let Some(member) = expr.as_member_expression() {
                walk_expression(member.object(), enter_functions, f);
            }
        }
        _ => {}
    }
}
