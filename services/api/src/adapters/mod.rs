pub mod chat_llm;
pub mod db;
pub mod json_store;
pub mod payments;

pub use chat_llm::{DisabledGenerator, OpenAiChatAdapter};
pub use db::PgStore;
pub use json_store::JsonFileStore;
pub use payments::{DisabledPayments, RazorpayPayments};
