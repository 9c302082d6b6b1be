use std::fmt::Display;

use thiserror::Error;
use tracing::debug;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::RedeclaredInBlock { .. } => "RedeclaredInBlock",
            ErrorImpl::UndefinedSymbol { .. } => "UndefinedSymbol",
            ErrorImpl::NotAType { .. } => "NotAType",
            ErrorImpl::UnexportedReference { .. } => "UnexportedReference",
            ErrorImpl::CannotDeclareName { .. } => "CannotDeclareName",
            ErrorImpl::ReservedFuncName { .. } => "ReservedFuncName",
            ErrorImpl::AssignmentMismatch { .. } => "AssignmentMismatch",
            ErrorImpl::NonNameOnLeft { .. } => "NonNameOnLeft",
            ErrorImpl::RepeatedOnLeft { .. } => "RepeatedOnLeft",
            ErrorImpl::NoNewVariables => "NoNewVariables",
            ErrorImpl::BlankInterfaceMethod => "BlankInterfaceMethod",
            ErrorImpl::DuplicateMember { .. } => "DuplicateMember",
            ErrorImpl::EmbeddedPointerToInterface => "EmbeddedPointerToInterface",
            ErrorImpl::EmbeddedPointerType => "EmbeddedPointerType",
            ErrorImpl::InvalidInterfaceAnnotation => "InvalidInterfaceAnnotation",
            ErrorImpl::MissingReceiver => "MissingReceiver",
            ErrorImpl::InvalidReceiverType { .. } => "InvalidReceiverType",
            ErrorImpl::NonLocalMethodBase { .. } => "NonLocalMethodBase",
            ErrorImpl::FieldMethodCollision { .. } => "FieldMethodCollision",
            ErrorImpl::MethodRedeclared { .. } => "MethodRedeclared",
            ErrorImpl::WriteBarrierProhibited => "WriteBarrierProhibited",
            ErrorImpl::WriteBarrierProhibitedByCaller { .. } => "WriteBarrierProhibitedByCaller",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::RedeclaredInBlock { name, .. } => ErrorTip::Suggestion(format!(
                "Rename `{}` or move it into a nested block to shadow the earlier declaration",
                name
            )),
            ErrorImpl::UndefinedSymbol { name } => {
                ErrorTip::Suggestion(format!("`{}` is not declared in any enclosing scope", name))
            }
            ErrorImpl::UnexportedReference { name, .. } => ErrorTip::Suggestion(format!(
                "Only names starting with an upper case letter are visible outside their package, `{}` is not",
                name
            )),
            ErrorImpl::AssignmentMismatch { variables, values } => ErrorTip::Suggestion(format!(
                "Expected {} values, received {}",
                variables, values
            )),
            ErrorImpl::NoNewVariables => {
                ErrorTip::Suggestion(String::from("Use `=` to assign to existing variables"))
            }
            ErrorImpl::FieldMethodCollision { name, .. } => ErrorTip::Suggestion(format!(
                "Rename either the field or the method `{}`",
                name
            )),
            ErrorImpl::WriteBarrierProhibitedByCaller { .. } => ErrorTip::Suggestion(String::from(
                "Mark the callee as permitting write barriers or remove the heap pointer store",
            )),
            _ => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

/// Where the earlier, conflicting declaration of a name came from.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviousDecl {
    At(Position),
    Import(String),
}

impl Display for PreviousDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviousDecl::At(pos) => write!(f, "previous declaration at {}", pos),
            PreviousDecl::Import(path) => {
                write!(f, "previous declaration during import {:?}", path)
            }
        }
    }
}

/// Why a receiver's base type cannot carry methods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReceiverProblem {
    NotDefined,
    Pointer,
    Interface,
    Unsupported,
}

impl Display for ReceiverProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiverProblem::NotDefined => write!(f, "is not a defined type"),
            ReceiverProblem::Pointer => write!(f, "is a pointer type"),
            ReceiverProblem::Interface => write!(f, "is an interface type"),
            ReceiverProblem::Unsupported => write!(f, "cannot have methods"),
        }
    }
}

/// The hops from a recursively restricted function down to a violator,
/// innermost first: each entry is the call position and the caller's name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallChain(pub Vec<(Position, String)>);

impl Display for CallChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (pos, caller) in &self.0 {
            write!(f, "\n\t{}: called by {}", pos, caller)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorImpl {
    #[error("{name} redeclared in this block\n\t{previous}")]
    RedeclaredInBlock { name: String, previous: PreviousDecl },
    #[error("undefined: {name}")]
    UndefinedSymbol { name: String },
    #[error("{name} is not a type")]
    NotAType { name: String },
    #[error("cannot refer to unexported name {package}.{name}")]
    UnexportedReference { package: String, name: String },
    #[error("cannot declare name {name}")]
    CannotDeclareName { name: String },
    #[error("cannot declare {name} - must be func")]
    ReservedFuncName { name: String },
    #[error("assignment mismatch: {variables} variables but {values} values")]
    AssignmentMismatch { variables: usize, values: usize },
    #[error("non-name {expr} on left side of :=")]
    NonNameOnLeft { expr: String },
    #[error("{name} repeated on left side of :=")]
    RepeatedOnLeft { name: String },
    #[error("no new variables on left side of :=")]
    NoNewVariables,
    #[error("methods must have a unique non-blank name")]
    BlankInterfaceMethod,
    #[error("duplicate {what} {name}")]
    DuplicateMember { what: &'static str, name: String },
    #[error("embedded type cannot be a pointer to interface")]
    EmbeddedPointerToInterface,
    #[error("embedded type cannot be a pointer")]
    EmbeddedPointerType,
    #[error("interface method cannot have annotation")]
    InvalidInterfaceAnnotation,
    #[error("missing receiver")]
    MissingReceiver,
    #[error("invalid receiver type {receiver} ({base} {problem})")]
    InvalidReceiverType {
        receiver: String,
        base: String,
        problem: ReceiverProblem,
    },
    #[error("cannot define new methods on non-local type {type_}")]
    NonLocalMethodBase { type_: String },
    #[error("type {type_} has both field and method named {name}")]
    FieldMethodCollision { type_: String, name: String },
    #[error("method redeclared: {type_}.{name}\n\t{previous}\n\t{current}")]
    MethodRedeclared {
        type_: String,
        name: String,
        previous: String,
        current: String,
    },
    #[error("write barrier prohibited")]
    WriteBarrierProhibited,
    #[error("write barrier prohibited by caller; {function}{chain}")]
    WriteBarrierProhibitedByCaller { function: String, chain: CallChain },
}

/// Non-fatal diagnostics collected over a compilation.
///
/// Reporting never aborts the current phase; the driver checks
/// [`Diagnostics::has_errors`] once the phase is over.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Error>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: Error) {
        debug!("diagnostic: {}", error);
        self.errors.push(error);
    }

    pub fn error(&mut self, error_impl: ErrorImpl, position: Position) {
        self.report(Error::new(error_impl, position));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }

    /// Names of every reported diagnostic, in report order.
    pub fn names(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.get_error_name()).collect()
    }

    pub fn take(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }
}

impl Extend<Error> for Diagnostics {
    fn extend<T: IntoIterator<Item = Error>>(&mut self, iter: T) {
        for error in iter {
            self.report(error);
        }
    }
}
