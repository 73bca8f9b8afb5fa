/*!
 * Built-in driver implementations.
 */

pub mod generic;

pub use generic::GenericNodeDriver;
