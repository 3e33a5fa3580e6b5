pub mod availability;
pub mod confirmation;
pub mod conflict;
pub mod expiration;
pub mod overlap;

#[cfg(test)]
pub(crate) mod testing;
