//! XOR constraint reasoning.
//!
//! XOR (parity) constraints are kept out of the CNF clause database. The
//! [`store`] module holds them with a two-watched-variable scheme that
//! triggers exactly when at most one variable of a constraint remains
//! unassigned. The [`gauss`] module additionally reasons about bounded sets
//! of constraints as GF(2) matrices, deriving implications and conflicts by
//! row reduction that the watch scheme alone would only find after further
//! decisions. Both report their implications through materialized reason
//! clauses managed by [`reasons`].
pub mod gauss;
pub mod matrix;
pub mod reasons;
pub mod store;
