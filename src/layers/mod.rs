/// Trainable layers of the rainfall regressor.
pub mod dropout;
pub mod linear;
pub mod lstm_cell;
