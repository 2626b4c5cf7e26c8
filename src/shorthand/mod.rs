// Public surface of the shorthand-template engine. Mirrors the flat
// `mod core; mod error; mod token;` layout of `obv_lexer::lexer`.

mod error;
mod processor;
mod tokenizer;
mod value;

pub use error::ShorthandError;
pub use processor::{ShorthandProcessor, ShorthandProcessorOptions};
pub use tokenizer::QuotedTokenizer;
pub use value::{Map, Value};
