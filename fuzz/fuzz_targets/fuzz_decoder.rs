#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use pantilt_core::decoder::FrameDecoder;
use pantilt_core::error::FrameError;

#[derive(Arbitrary, Debug)]
struct Input {
    width: u8,
    height: u8,
    /// Chunk boundaries, as serial reads would split the stream.
    cuts: Vec<u16>,
    /// Abandon the in-flight frame after this chunk, like a framing timeout.
    abandon_after: Option<u8>,
    bytes: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let (w, h) = (usize::from(input.width.max(1)), usize::from(input.height.max(1)));
    let mut dec = FrameDecoder::new(w, h);
    let mut rest = input.bytes.as_slice();
    let mut chunk_no = 0u8;
    for &cut in input.cuts.iter().chain(std::iter::once(&u16::MAX)) {
        let n = usize::from(cut).min(rest.len());
        let (chunk, tail) = rest.split_at(n);
        for frame in dec.feed(chunk) {
            assert_eq!(frame.pixels().len(), w * h);
        }
        if input.abandon_after == Some(chunk_no) {
            dec.abandon(&FrameError::FramingTimeout);
        }
        rest = tail;
        chunk_no = chunk_no.wrapping_add(1);
        if rest.is_empty() {
            break;
        }
    }
    let stats = dec.stats();
    assert!(stats.frames <= input.bytes.len() as u64);
});
