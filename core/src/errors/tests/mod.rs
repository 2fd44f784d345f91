mod error_tests;
