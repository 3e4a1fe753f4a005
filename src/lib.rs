pub mod ast;
pub mod cli;
pub mod coercion;
pub mod collections;
pub mod compiler;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{Axis, BinOp, Expr, Token, TokenKind};
pub use collections::{ChildValues, InnerOuterJoin, Union, Where};
pub use context::{DocumentResolver, EvalContext, Variables};
pub use error::{Error, Result, SyntaxError, UserError};
pub use evaluator::{CompiledExpression, Evaluator, EvaluatorBuilder};
pub use functions::{Arity, FunctionContainer, FunctionEntry, FunctionRegistry, Invocation};
pub use value::{DataObject, PropertySource, Record, Value};
