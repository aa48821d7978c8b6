mod helpers;
mod resolver;
mod session;
