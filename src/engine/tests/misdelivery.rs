//! Misdelivery detection and invalidation suppression.

use super::*;
use std::time::{Duration, Instant};

fn misdelivered(origin: u8) -> Packet {
    packet()
        .psrc(FOREIGN_SRC)
        .pdst(GATEWAY)
        .origin(origin)
        .payload(30)
        .build()
}

fn expected_tag(origin: u8) -> Output {
    Output::forward(
        packet()
            .psrc(FOREIGN_SRC)
            .pdst(GATEWAY)
            .header(PacketType::Tag, origin, "10.0.0.2", "0.0.0.0")
            .payload(30)
            .build(),
    )
}

fn expected_invalidate(origin: u8) -> Output {
    Output::mirror(
        packet()
            .psrc(FOREIGN_SRC)
            .pdst("0.0.0.0")
            .header(PacketType::Invalidate, origin, "10.0.0.2", "0.0.0.0")
            .build(),
    )
}

#[test]
fn test_misdelivery_generates_tag_and_invalidation() {
    let engine = make_engine(Role::Tor, 0);

    let outputs = engine.process(misdelivered(3), PortClass::Access, Instant::now());

    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs.primary, Some(expected_tag(3)));
    assert_eq!(outputs.generated, Some(expected_invalidate(3)));

    let stats = engine.stats();
    assert_eq!(stats.misdeliveries, 1);
    assert_eq!(stats.invalidations_sent, 1);
}

#[test]
fn test_misdelivery_suppressed_within_timeout() {
    let engine = Engine::new(
        engine_config(Role::Tor, 0).with_retransmit_timeout(Duration::from_secs(10)),
    )
    .unwrap();
    let t0 = Instant::now();

    let first = engine.process(misdelivered(3), PortClass::Access, t0);
    assert_eq!(first.generated, Some(expected_invalidate(3)));

    let second = engine.process(misdelivered(3), PortClass::Access, t0 + Duration::from_millis(1));
    assert_eq!(second.primary, Some(expected_tag(3)));
    assert_eq!(second.generated, None);
    assert_eq!(engine.stats().invalidations_suppressed, 1);

    // After the window the invalidation resumes.
    let third = engine.process(misdelivered(3), PortClass::Access, t0 + Duration::from_secs(11));
    assert_eq!(third.generated, Some(expected_invalidate(3)));

    // A different origin has its own window.
    let other = engine.process(misdelivered(4), PortClass::Access, t0 + Duration::from_secs(11));
    assert_eq!(other.primary, Some(expected_tag(4)));
    assert_eq!(other.generated, Some(expected_invalidate(4)));
}

#[test]
fn test_default_timeout_window() {
    let engine = make_engine(Role::Tor, 0);
    let t0 = Instant::now();
    assert_eq!(engine.retransmit_timeout(), Duration::from_millis(8));

    assert!(engine.process(misdelivered(3), PortClass::Access, t0).generated.is_some());
    assert!(engine
        .process(misdelivered(3), PortClass::Access, t0 + Duration::from_millis(7))
        .generated
        .is_none());
    assert!(engine
        .process(misdelivered(3), PortClass::Access, t0 + Duration::from_millis(8))
        .generated
        .is_some());
}

#[test]
fn test_timeout_change_applies_live() {
    let engine = make_engine(Role::Tor, 0);
    engine.set_retransmit_timeout(Duration::from_secs(10));
    let t0 = Instant::now();

    assert!(engine.process(misdelivered(3), PortClass::Access, t0).generated.is_some());
    assert!(engine
        .process(misdelivered(3), PortClass::Access, t0 + Duration::from_secs(2))
        .generated
        .is_none());
}

#[test]
fn test_sub_millisecond_timeout_suppresses() {
    let engine = make_engine(Role::Tor, 0);
    engine.set_retransmit_timeout(Duration::from_micros(500));
    assert_eq!(engine.retransmit_timeout(), Duration::from_micros(500));
    let t0 = Instant::now();

    assert!(engine.process(misdelivered(3), PortClass::Access, t0).generated.is_some());
    assert!(engine
        .process(misdelivered(3), PortClass::Access, t0 + Duration::from_micros(100))
        .generated
        .is_none());
    assert!(engine
        .process(misdelivered(3), PortClass::Access, t0 + Duration::from_micros(600))
        .generated
        .is_some());
    assert_eq!(engine.stats().invalidations_suppressed, 1);
}

#[test]
fn test_misdelivered_packet_learns_source() {
    let engine = make_engine(Role::Tor, 0);

    let outputs = engine.process(misdelivered(3), PortClass::Access, Instant::now());

    assert_eq!(outputs.primary, Some(expected_tag(3)));
    assert_eq!(outputs.generated, Some(expected_invalidate(3)));
    assert_eq!(
        engine.cache().peek(addr("10.0.0.1")),
        Slot::valid(addr("10.0.0.1"), addr(FOREIGN_SRC), false)
    );
    assert_eq!(engine.cache().lookup(addr("10.0.0.1")), Some(addr(FOREIGN_SRC)));
    assert_eq!(engine.stats().learned, 1);
}

#[test]
fn test_invalidation_takes_generated_slot_over_spill() {
    let engine = Engine::new(
        engine_config(Role::Tor, 0).with_retransmit_timeout(Duration::from_secs(10)),
    )
    .unwrap();
    let t0 = Instant::now();
    // Same slot as 10.0.0.1.
    engine.cache().set(addr("10.0.22.100"), addr("132.68.0.7"), false);

    let first = engine.process(misdelivered(3), PortClass::Access, t0);
    assert_eq!(first.primary, Some(expected_tag(3)));
    assert_eq!(first.generated, Some(expected_invalidate(3)));
    assert_eq!(engine.cache().lookup(addr("10.0.22.100")), None);
    let stats = engine.stats();
    assert_eq!(stats.spills_dropped, 1);
    assert_eq!(stats.evictions_spilled, 0);

    // With the invalidation suppressed, the spill goes out instead.
    engine.cache().set(addr("10.0.22.100"), addr("132.68.0.7"), false);
    let second = engine.process(misdelivered(3), PortClass::Access, t0 + Duration::from_millis(1));
    assert_eq!(second.primary, Some(expected_tag(3)));
    assert_eq!(
        second.generated,
        Some(Output::forward(
            packet()
                .psrc(FOREIGN_SRC)
                .pdst(GATEWAY)
                .header(PacketType::Evict, 3, "10.0.22.100", "132.68.0.7")
                .build(),
        ))
    );
    let stats = engine.stats();
    assert_eq!(stats.invalidations_suppressed, 1);
    assert_eq!(stats.evictions_spilled, 1);
    assert_eq!(stats.spills_dropped, 1);
}

#[test]
fn test_misdelivered_packet_is_not_resolved() {
    let engine = make_engine(Role::Tor, 0);
    engine.cache().set(addr("10.0.0.2"), addr("132.68.0.2"), false);

    let outputs = engine.process(misdelivered(3), PortClass::Access, Instant::now());

    assert_eq!(outputs.primary, Some(expected_tag(3)));
    assert!(!engine.cache().peek(addr("10.0.0.2")).is_active());
}

#[test]
fn test_misdelivered_resolved_packet_redirected_to_gateway() {
    let engine = make_engine(Role::Tor, 0);
    let input = packet().psrc(FOREIGN_SRC).origin(3).build();

    let outputs = engine.process(input, PortClass::Access, Instant::now());

    let tag = outputs.primary.unwrap().packet;
    assert_eq!(tag.physical_dst(), addr(GATEWAY));
    assert_eq!(tag.header, V2pHeader::new(PacketType::Tag, 3, addr("10.0.0.2"), NO_KEY));

    let invalidate = outputs.generated.unwrap().packet;
    assert_eq!(invalidate.physical_dst(), NO_KEY);
}

#[test]
fn test_tag_from_foreign_source_is_not_redetected() {
    let engine = make_engine(Role::Tor, 0);
    let input = packet()
        .psrc(FOREIGN_SRC)
        .pdst(GATEWAY)
        .header(PacketType::Tag, 3, "10.0.0.2", "0.0.0.0")
        .build();

    let outputs = engine.process(input, PortClass::Uplink, Instant::now());

    assert_eq!(outputs.len(), 1);
    assert_eq!(engine.stats().misdeliveries, 0);
}

#[test]
fn test_spine_does_not_detect_misdelivery() {
    let engine = make_engine(Role::Spine, 0);

    let outputs = engine.process(misdelivered(3), PortClass::Access, Instant::now());

    assert_eq!(outputs.len(), 1);
    assert_eq!(
        outputs.primary.unwrap().packet.header.packet_type,
        PacketType::Data
    );
}

#[test]
fn test_purge_expired_pending() {
    let engine = make_engine(Role::Tor, 0);
    let t0 = Instant::now();
    engine.process(misdelivered(3), PortClass::Access, t0);
    engine.process(misdelivered(4), PortClass::Access, t0);
    assert_eq!(engine.pending().len(), 2);

    assert_eq!(engine.purge_expired(t0 + Duration::from_millis(8)), 2);
    assert!(engine.pending().is_empty());
}
