//! Unit tests for pieces that don't need mocked collaborators.
