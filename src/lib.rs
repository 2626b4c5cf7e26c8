// Library crate root. Split out from the binary so integration tests
// under `tests/` can exercise the public API directly, the way a
// library crate normally would; `obv_lexer` never needed this split
// because it had no integration test suite.

pub mod shorthand;
