// core/src/rules/mod.rs

//! Pure business rules. Nothing here touches storage.

pub mod access;
pub mod city;
pub mod delivery;
pub mod phone;
pub mod transitions;
