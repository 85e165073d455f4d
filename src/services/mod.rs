pub mod day_plan;
pub mod mqtt;
pub mod open_meteo;
pub mod publisher;
pub mod temperature;
pub mod time_codec;
pub mod timetable;
pub mod walk_model;
