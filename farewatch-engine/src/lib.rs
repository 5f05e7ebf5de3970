pub mod email;
pub mod fanout;
pub mod matcher;
pub mod pagination;
pub mod processor;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;
