pub mod diophantine;
pub mod int_matrix;
pub mod integer_basis;
pub mod integer_math;
pub mod lll;
pub mod rational;
pub mod rational_approximation;
pub mod rational_matrix;
pub mod rlll;
pub mod smith;
