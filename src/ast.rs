//! # Reshape Expression Language - Abstract Syntax Tree
//!
//! This module defines the tokens and the expression tree of the expression
//! language embedded in reshape transform templates.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer and nested by the
//!   structural parser
//! - **[expressions]** - Expression tree nodes (literals, paths, indexers,
//!   variables, calls, operators, conditionals)
//! - **[operators]** - Binary operators and their precedence
//!
//! ## Quick Start
//!
//! ```text
//! Make == 'Chevy' && Year > 2010
//! ```
//!
//! Compares two properties of the current data item.
//!
//! ## Core Concepts
//!
//! ### Paths
//!
//! Bare names are property lookups against the current data. Dots chain
//! lookups, and when a step yields an array the remaining steps are applied
//! to every element and the results flattened:
//!
//! ```text
//! Orders.Items      // every item of every order
//! ```
//!
//! ### Indexers
//!
//! Square brackets index arrays by position or filter them with a
//! predicate. The choice is made at run time from the value inside the
//! brackets:
//!
//! ```text
//! Items[0]             // first item
//! Items[Price > 100]   // items costing more than 100
//! @[Age > 21]          // current data filtered
//! ```
//!
//! ### Variables and Ancestors
//!
//! ```text
//! $customer.Name       // variable with a sub-path
//! /Region              // property of the parent item
//! //Company            // property of the grandparent item
//! ```
//!
//! ### Functions and Conditionals
//!
//! ```text
//! substring(Name, 0, 3)
//! Total > 100 ? 'large' : 'small'
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Axis, Expr};
pub use operators::BinOp;
pub use tokens::{Token, TokenKind};
