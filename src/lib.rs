#![allow(clippy::unreadable_literal)]
#![allow(clippy::type_complexity)]

#[macro_use]
extern crate log;
extern crate crossbeam_channel;

pub mod dictionary;
pub mod driver;
pub mod error;
pub mod events;
pub mod id_codec;
pub mod inline;
mod logger;
pub mod options;
pub mod reasoner;
pub mod rule;
pub mod sequence;
pub mod storage;
pub mod term;
pub mod term_codec;
pub mod triple;
mod util;

pub use dictionary::{DictionaryStore, Lookup};
pub use driver::{Driver, State};
pub use error::{Error, Result, Status};
pub use events::{ChannelSink, Event, Sink};
pub use id_codec::Decimal;
pub use logger::init as init_logging;
pub use options::{ReasonOptions, SequenceOptions, StoreOptions};
pub use reasoner::{CancellationToken, DeltaEngine, MaterializeOutcome};
pub use rule::{Binding, Condition, Operand, Rule};
pub use sequence::{SequenceAllocator, SequenceKind};
pub use storage::{ColumnFamily, Storage, WriteBatch};
pub use term::{Literal, LiteralKind, Term};
pub use triple::{Fact, MemIndex, Pattern, Slot, TermId, TripleIndex, TripleStream};
