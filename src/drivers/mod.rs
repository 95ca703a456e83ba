pub mod flightstick;
