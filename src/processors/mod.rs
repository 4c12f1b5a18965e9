//! Domain processors (spec.md §2/§4, SPEC_FULL §E.5): one module per BiDi
//! module, each translating its commands into CDP calls/registry
//! mutations and returning the `result` payload for a success reply.
//! `script`, `input`, and `storage` are explicitly out of the core's scope
//! (spec.md §1 names JS-value serialization, the input-action
//! interpreter, and the preload-script registry as external
//! collaborators) but still participate in command routing, replying
//! `unsupported operation` rather than `unknown command` so a client can
//! tell "not implemented" apart from "not a real command".

pub mod browsing_context;
pub mod input;
pub mod network;
pub mod script;
pub mod session;
pub mod storage;
