mod chatroom_tests;
mod gateway_tests;
mod health_tests;
mod message_tests;
