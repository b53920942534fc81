//! # pixdrop
//!
//! Watch a folder for new photos, shrink them, stamp a QR link on a copy and
//! push both to an S3-compatible bucket (Cloudflare R2 by default). The public
//! URL of the QR copy lands on the clipboard, ready to paste.
//!
//! # Architecture: One File, One Pass
//!
//! Every detected file goes through the same short pipeline, independently of
//! every other file:
//!
//! ```text
//! 1. Detect    watch folder  →  path            (notify event, extension filter)
//! 2. Generate  path          →  [A, B]          (resize + JPEG, QR overlay copy)
//! 3. Publish   [A, B]        →  bucket          (S3 PUT each, announce B's URL)
//! 4. Record    keys, name    →  uploaded.json   (ledger of what is done)
//! ```
//!
//! The stages are separate types joined by the [`intake`] coordinator:
//!
//! - **Testability**: generation is a pure function of the source and a
//!   [`RenderPlan`](imaging::RenderPlan), and publishing goes through traits,
//!   so the state machine is tested without pixels or network.
//! - **Dry runs**: swapping the object store for
//!   [`MemoryStore`](publish::MemoryStore) exercises the whole path locally.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`watch`] | notify watcher, per-file task dispatch, in-flight tracking |
//! | [`intake`] | Per-file state machine: ignore, skip, generate, publish, record |
//! | [`artifact`] | Builds the uploaded images and their keys from one source |
//! | [`imaging`] | Pure-Rust image operations: fit-inside resize, QR rendering, JPEG |
//! | [`publish`] | `ObjectStore` / `Announcer` traits, dry-run store, clipboard |
//! | [`s3`] | S3-compatible store with Signature V4 |
//! | [`ledger`] | Durable JSON set of uploaded identifiers |
//! | [`naming`] | Accepted extensions, storage keys, public URLs |
//! | [`config`] | `pixdrop.toml` + environment loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## UUID Keys
//!
//! Storage keys are random UUIDs by default. Screenshot names leak dates,
//! app names and sometimes private titles; a UUID leaks nothing and never
//! collides. `images.naming = "source"` keeps the original stem for people who
//! prefer readable URLs.
//!
//! ## URL Before Upload
//!
//! A public URL is `public_url + "/" + key` and nothing else, so the QR code can
//! point at the original before either image is uploaded. No round trip to the
//! bucket is needed to learn where an object ended up.
//!
//! ## Ledger Records Keys and Names
//!
//! Every uploaded key is recorded the moment its upload succeeds, and a
//! `source/{name}` completion id once all of its artifacts are up. The
//! completion id is what makes a re-detected file (a second notification, a
//! restart) a no-op. It lives in its own namespace, so with
//! `naming = "source"` the key `a.jpg` of `a.png` never passes for a finished
//! `a.jpg`. In that mode each key is also claimed by the source that first
//! produced it, and a second source with the same stem is refused instead of
//! overwriting it.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing (Lanczos3), compositing and JPEG encoding use the `image`
//! crate; QR matrices come from `qrcode`. No ImageMagick, no libvips, no system
//! packages: the binary is self-contained.

pub mod artifact;
pub mod config;
pub mod imaging;
pub mod intake;
pub mod ledger;
pub mod naming;
pub mod output;
pub mod publish;
pub mod s3;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
