//! Node command handlers, one module per concern.
//!
//! Every handler reads the current content graph of the stream, checks its
//! preconditions and returns the complete event list, or an error and no
//! events at all.

pub mod constraints;
pub mod copying;
pub mod coverage;
pub mod creation;
pub mod dimension_adjustment;
pub mod disabling;
pub mod modification;
pub mod moving;
pub mod references;
pub mod removal;
pub mod type_change;
pub mod variation;

use crate::domain::cqrs::ContentStreamEvent;
use crate::domain::errors::ContentRepositoryError;

pub(crate) type HandlerResult = Result<Vec<ContentStreamEvent>, ContentRepositoryError>;
