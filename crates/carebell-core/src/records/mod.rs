//! Care records: profile, memories, chat, emergency contacts and medications.

mod store;

pub use store::SqliteCareStore;
