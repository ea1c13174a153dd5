//! Exception handling clauses of a method body.
//!
//! Clause boundaries are expressed as instruction indices into [`crate::metadata::method::MethodBody::instructions`]
//! rather than byte offsets, so rewriting operands or recomputing offsets never invalidates them.
//! An end index equal to the instruction count means "until the end of the body".

use bitflags::bitflags;

use crate::metadata::typesystem::TypeRef;

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause, [`ExceptionHandler::catch_type`] holds the caught type.
        const EXCEPTION = 0x0000;

        /// An exception filter and handler clause.
        ///
        /// The filter code starting at [`ExceptionHandler::filter_start`] runs before the handler
        /// to decide whether the exception is handled.
        const FILTER = 0x0001;

        /// A finally clause.
        const FINALLY = 0x0002;

        /// A fault clause, a finally that only runs when an exception is thrown.
        const FAULT = 0x0004;
    }
}

/// A protected region and the code handling it.
///
/// ```text
/// try {
///     // instructions[try_start..try_end]
/// }
/// catch (catch_type) {
///     // instructions[handler_start..handler_end]
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    /// Clause kind
    pub flags: ExceptionHandlerFlags,
    /// First instruction of the protected region
    pub try_start: usize,
    /// One past the last instruction of the protected region
    pub try_end: usize,
    /// First instruction of the handler
    pub handler_start: usize,
    /// One past the last instruction of the handler
    pub handler_end: usize,
    /// First instruction of the filter, for filter clauses
    pub filter_start: Option<usize>,
    /// Caught exception type, for typed clauses
    pub catch_type: Option<TypeRef>,
}

impl ExceptionHandler {
    /// A `catch (catch_type)` clause
    #[must_use]
    pub fn catch(
        try_range: std::ops::Range<usize>,
        handler_range: std::ops::Range<usize>,
        catch_type: TypeRef,
    ) -> Self {
        ExceptionHandler {
            flags: ExceptionHandlerFlags::EXCEPTION,
            try_start: try_range.start,
            try_end: try_range.end,
            handler_start: handler_range.start,
            handler_end: handler_range.end,
            filter_start: None,
            catch_type: Some(catch_type),
        }
    }

    /// A `finally` clause
    #[must_use]
    pub fn finally(try_range: std::ops::Range<usize>, handler_range: std::ops::Range<usize>) -> Self {
        ExceptionHandler {
            flags: ExceptionHandlerFlags::FINALLY,
            try_start: try_range.start,
            try_end: try_range.end,
            handler_start: handler_range.start,
            handler_end: handler_range.end,
            filter_start: None,
            catch_type: None,
        }
    }

    /// Returns `true` if every boundary lies within a body of `count` instructions
    #[must_use]
    pub fn is_within(&self, count: usize) -> bool {
        self.try_start <= self.try_end
            && self.try_end <= count
            && self.handler_start <= self.handler_end
            && self.handler_end <= count
            && self.filter_start.map_or(true, |filter| filter < count)
    }
}
