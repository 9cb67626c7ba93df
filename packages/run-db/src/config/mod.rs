pub mod db;
pub mod paths;
