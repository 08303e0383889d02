pub mod tw;
