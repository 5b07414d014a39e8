use pantilt_core::decoder::{DecoderState, FrameDecoder};
use pantilt_core::mocks::{ChunkedSource, framed};
use pantilt_core::{DecoderCfg, ExactFrameReader, FrameError, FrameReader, StreamFrameReader};
use pantilt_traits::Frame;
use pantilt_traits::clock::test_clock::TestClock;
use proptest::prelude::*;

const W: usize = 160;
const H: usize = 120;

fn start_only(payload: &[u8]) -> Vec<u8> {
    let mut v = b"START_IMAGE\r\n".to_vec();
    v.extend_from_slice(payload);
    v
}

fn drain<R: FrameReader>(reader: &mut R, polls: usize) -> (Vec<Frame>, Vec<FrameError>) {
    let mut frames = Vec::new();
    let mut errors = Vec::new();
    for _ in 0..polls {
        match reader.next_frame() {
            Ok(Some(f)) => frames.push(f),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    (frames, errors)
}

#[test]
fn full_frame_of_128_decodes_once() {
    let mut dec = FrameDecoder::new(W, H);
    let frames = dec.feed(&framed(&[128; W * H]));
    assert_eq!(frames.len(), 1);
    let f = &frames[0];
    assert_eq!((f.width(), f.height()), (W, H));
    assert!(f.pixels().iter().all(|&p| p == 128));
    assert_eq!(dec.state(), DecoderState::Idle);
}

#[test]
fn truncated_frame_times_out_and_next_frame_still_decodes() {
    let clock = TestClock::new();
    let mut source = ChunkedSource::new(
        [framed(&[128; W * H]), start_only(&[128; W * H - 1])],
        clock.clone(),
    );
    source.push_gaps(25);
    source.push(framed(&[7; W * H]));
    let mut reader = StreamFrameReader::with_clock(source, DecoderCfg::default(), clock);

    let (frames, errors) = drain(&mut reader, 60);

    assert_eq!(frames.len(), 2);
    assert!(frames[0].pixels().iter().all(|&p| p == 128));
    assert!(frames[1].pixels().iter().all(|&p| p == 7));
    assert_eq!(errors, vec![FrameError::FramingTimeout]);
    assert_eq!(reader.decoder().state(), DecoderState::Idle);
    let stats = reader.stats();
    assert_eq!((stats.frames, stats.timeouts), (2, 1));
}

#[test]
fn capture_survives_gaps_shorter_than_marker_timeout() {
    let clock = TestClock::new();
    let whole = framed(&[42; W * H]);
    let (head, tail) = whole.split_at(5_000);
    let mut source = ChunkedSource::new([head.to_vec()], clock.clone());
    source.push_gaps(15);
    source.push(tail.to_vec());
    let mut reader = StreamFrameReader::with_clock(source, DecoderCfg::default(), clock);

    let (frames, errors) = drain(&mut reader, 40);
    assert_eq!(frames.len(), 1);
    assert!(errors.is_empty());
}

#[test]
fn consecutive_frames_arrive_in_order_without_mixing() {
    let a: Vec<u8> = (0..W * H).map(|i| (i % 251) as u8).collect();
    let b: Vec<u8> = (0..W * H).map(|i| 255 - (i % 199) as u8).collect();
    let mut bytes = framed(&a);
    bytes.extend_from_slice(&framed(&b));

    let mut dec = FrameDecoder::new(W, H);
    let frames = dec.feed(&bytes);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].pixels(), a.as_slice());
    assert_eq!(frames[1].pixels(), b.as_slice());
}

#[test]
fn telemetry_and_reset_banner_around_frames_are_ignored() {
    let mut bytes = b"Start!\r\nfps=9.8 temp=41\r\n".to_vec();
    bytes.extend_from_slice(&framed(&[3; 4 * 2]));
    bytes.extend_from_slice(b"heap=1234\r\n");

    let mut dec = FrameDecoder::new(4, 2);
    let frames = dec.feed(&bytes);
    assert_eq!(frames.len(), 1);
    assert_eq!(dec.stats().resets, 1);
    assert_eq!(dec.stats().dropped(), 0);
}

// ── exact-read reader ────────────────────────────────────────────────────────

#[test]
fn exact_reader_reads_one_frame() {
    let clock = TestClock::new();
    let source = ChunkedSource::new([b"noise\r\n".to_vec(), framed(&[128; W * H])], clock.clone());
    let mut reader = ExactFrameReader::with_clock(source, DecoderCfg::default(), clock);

    let frame = reader.next_frame().unwrap().expect("frame");
    assert!(frame.pixels().iter().all(|&p| p == 128));
    assert_eq!(reader.stats().frames, 1);
}

#[test]
fn exact_reader_short_payload_clears_input_and_recovers() {
    let clock = TestClock::new();
    let mut short = start_only(&[9; 100]);
    short.extend_from_slice(b"END_IMAGE\r\n");
    let mut source = ChunkedSource::new([short], clock.clone());
    source.push_gaps(12);
    source.push(framed(&[200; W * H]));
    let clears = source.clears();
    let mut reader = ExactFrameReader::with_clock(source, DecoderCfg::default(), clock);

    let err = reader.next_frame().unwrap_err();
    assert_eq!(
        err,
        FrameError::ShortRead {
            expected: W * H,
            got: 111
        }
    );
    assert_eq!(*clears.lock().unwrap(), 1);

    let frame = reader.next_frame().unwrap().expect("frame after recovery");
    assert!(frame.pixels().iter().all(|&p| p == 200));
    let stats = reader.stats();
    assert_eq!((stats.frames, stats.short_reads), (1, 1));
}

#[test]
fn exact_reader_rejects_bytes_before_end_marker() {
    let clock = TestClock::new();
    let mut over = start_only(&[1; W * H]);
    over.extend_from_slice(b"xxEND_IMAGE\r\n");
    let source = ChunkedSource::new([over], clock.clone());
    let mut reader = ExactFrameReader::with_clock(source, DecoderCfg::default(), clock);

    assert_eq!(reader.next_frame(), Err(FrameError::Overrun));
    assert_eq!(reader.stats().overruns, 1);
}

#[test]
fn exact_reader_times_out_without_start_marker() {
    let clock = TestClock::new();
    let source = ChunkedSource::new([b"just telemetry\r\n".to_vec()], clock.clone());
    let mut reader = ExactFrameReader::with_clock(source, DecoderCfg::default(), clock);

    assert_eq!(reader.next_frame(), Err(FrameError::FramingTimeout));
    assert_eq!(reader.stats().timeouts, 1);
}

#[test]
fn exact_reader_times_out_when_end_marker_never_arrives() {
    let clock = TestClock::new();
    let source = ChunkedSource::new([start_only(&[5; W * H])], clock.clone());
    let clears = source.clears();
    let mut reader = ExactFrameReader::with_clock(source, DecoderCfg::default(), clock.clone());

    assert_eq!(reader.next_frame(), Err(FrameError::FramingTimeout));
    assert_eq!(*clears.lock().unwrap(), 1);
    let stats = reader.stats();
    assert_eq!((stats.frames, stats.timeouts), (0, 1));
    assert!(clock.elapsed() >= DecoderCfg::default().marker_timeout());
}

#[test]
fn capture_reopened_after_overrun_gets_its_own_timeout() {
    let clock = TestClock::new();
    let cfg = DecoderCfg {
        width: 4,
        height: 2,
        marker_timeout_ms: 2_000,
        poll_timeout_ms: 100,
        ..DecoderCfg::default()
    };
    // First capture sits open for 1.9 s, then ends in an overrun and a new
    // START in the same chunk.
    let mut source = ChunkedSource::new([start_only(&[1; 8])], clock.clone());
    source.push_gaps(19);
    let mut reopen = b"xxEND_IMAGE\r\n".to_vec();
    reopen.extend_from_slice(&start_only(&[9; 4]));
    source.push(reopen);
    source.push_gaps(1);
    let mut tail = vec![9; 4];
    tail.extend_from_slice(b"END_IMAGE\r\n");
    source.push(tail);
    let mut reader = StreamFrameReader::with_clock(source, cfg, clock);

    let (frames, errors) = drain(&mut reader, 30);

    assert_eq!(errors, vec![FrameError::Overrun]);
    assert_eq!(frames.len(), 1);
    assert!(frames[0].pixels().iter().all(|&p| p == 9));
    let stats = reader.stats();
    assert_eq!((stats.frames, stats.overruns, stats.timeouts), (1, 1, 0));
}

#[test]
fn decoder_counts_every_capture_opened() {
    let mut dec = FrameDecoder::new(4, 2);
    dec.feed(&start_only(&[1; 8]));
    dec.feed(b"junk\r\n");
    dec.feed(&framed(&[2; 8]));
    assert_eq!(dec.capture_epoch(), 2);
    assert_eq!(dec.state(), DecoderState::Idle);
}

// ── properties ───────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn any_framed_payload_decodes_exactly(
        payload in proptest::collection::vec(any::<u8>(), 8 * 4),
        split in 0usize..64,
    ) {
        let bytes = framed(&payload);
        let cut = split.min(bytes.len());
        let mut dec = FrameDecoder::new(8, 4);
        let mut frames = dec.feed(&bytes[..cut]);
        frames.extend(dec.feed(&bytes[cut..]));
        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].pixels(), payload.as_slice());
    }

    #[test]
    fn short_payload_never_yields_a_frame(
        len in 0usize..(8 * 4),
    ) {
        let mut bytes = start_only(&vec![0xAB; len]);
        bytes.extend_from_slice(b"END_IMAGE\r\n");
        let mut dec = FrameDecoder::new(8, 4);
        prop_assert!(dec.feed(&bytes).is_empty());
    }

    #[test]
    fn arbitrary_bytes_only_ever_yield_whole_frames(
        bytes in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let mut dec = FrameDecoder::new(8, 4);
        for f in dec.feed(&bytes) {
            prop_assert_eq!(f.pixels().len(), 32);
        }
    }
}
