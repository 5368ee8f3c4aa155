mod config_tests;
mod db_tests;
