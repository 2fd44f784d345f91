mod mocks;

mod rotation_tests;
