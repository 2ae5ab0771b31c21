mod enumeration_tests;
