pub mod keygen;
pub mod session;
pub mod sign;
