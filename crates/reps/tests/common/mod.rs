//! Shared helpers for the engine scenario tests.
#![allow(dead_code)]

use reps::{get_mutable_rep, RepWriteStream};
use store::{RepKey, Trail, TxnId};

/// Creates a fresh mutable representation under `txn`, writes `contents`
/// through a write stream and seals it.
pub fn write_contents(trail: &mut Trail<'_>, txn: TxnId, contents: &[u8]) -> RepKey {
    let key = get_mutable_rep(trail, None, txn).expect("mutable representation");
    let mut stream = RepWriteStream::open(trail, key, txn).expect("write stream opens");
    stream.write(trail, contents).expect("write succeeds");
    stream.close(trail).expect("close succeeds");
    key
}

/// Reads the whole content back through a read stream, exercising the
/// end-of-stream checksum verification.
pub fn stream_contents(trail: &mut Trail<'_>, key: RepKey) -> Vec<u8> {
    let mut stream =
        reps::RepReadStream::open(trail, Some(key)).expect("read stream opens");
    let mut contents = Vec::new();
    let mut buf = [0u8; 48];
    loop {
        let got = stream.read(trail, &mut buf).expect("read succeeds");
        if got == 0 {
            break;
        }
        contents.extend_from_slice(&buf[..got]);
    }
    contents
}
