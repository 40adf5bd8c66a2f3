//! Cross-crate tests driving the account client against in-memory
//! collaborators that record call order.

#[cfg(test)]
mod mocks;
