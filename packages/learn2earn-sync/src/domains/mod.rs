pub mod learn2earn;
