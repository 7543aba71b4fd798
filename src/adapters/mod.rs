//! Framework adapters (§4.8): boundary glue between a host framework's request/response
//! types and the [`Authenticator`](crate::authenticator::Authenticator)'s pure
//! `(header_in) -> (valid | challenge_params)` contract. Rocket is the only framework
//! this crate ships an adapter for, generalizing the teacher's `LsatMiddleware`.

pub mod rocket;
