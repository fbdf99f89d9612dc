//! Command-line front end for the impot engine: file and JSON handling,
//! rule table selection and logging setup. The calculations live in
//! `impot-core`.

pub mod commands;
pub mod logging;
