pub mod cycle_writer;
pub mod event_reader;
