//! Integration tests: the command router over mocked collaborators, and the
//! YouTube catalog client against a mock HTTP server.

mod auto_pause;
mod music_manager;
