//! Multi-participant scenarios.

#[cfg(test)]
mod support;

#[cfg(test)]
mod game;
#[cfg(test)]
mod mesh;
