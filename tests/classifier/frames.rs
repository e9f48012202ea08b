//! Frame builders shared by the scenarios

use std::net::{Ipv4Addr, Ipv6Addr};
use xdpgate::protocol::ethernet::FrameBuilder;
use xdpgate::protocol::ipv4::Ipv4Builder;
use xdpgate::protocol::ipv6::Ipv6Builder;
use xdpgate::protocol::tcp::TcpBuilder;
use xdpgate::protocol::udp::UdpBuilder;
use xdpgate::protocol::{ip_proto, EtherType};

pub const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
pub const STRANGER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 9);
pub const CLIENT6: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 5);

pub fn ipv4(src: Ipv4Addr, protocol: u8, l4: &[u8]) -> Vec<u8> {
    let ip = Ipv4Builder::new()
        .protocol(protocol)
        .src_addr(src)
        .dst_addr(Ipv4Addr::new(10, 0, 0, 1))
        .payload(l4)
        .build();
    FrameBuilder::new()
        .ethertype(EtherType::Ipv4 as u16)
        .payload(&ip)
        .build()
}

pub fn ipv6(src: Ipv6Addr, next_header: u8, payload: &[u8]) -> Vec<u8> {
    let ip = Ipv6Builder::new()
        .next_header(next_header)
        .src_addr(src)
        .dst_addr(Ipv6Addr::LOCALHOST)
        .payload(payload)
        .build();
    FrameBuilder::new()
        .ethertype(EtherType::Ipv6 as u16)
        .payload(&ip)
        .build()
}

pub fn tcp4(src: Ipv4Addr, dst_port: u16) -> Vec<u8> {
    let tcp = TcpBuilder::new().src_port(40000).dst_port(dst_port).build();
    ipv4(src, ip_proto::TCP, &tcp)
}

pub fn udp4(src: Ipv4Addr, dst_port: u16) -> Vec<u8> {
    let udp = UdpBuilder::new().src_port(40000).dst_port(dst_port).build();
    ipv4(src, ip_proto::UDP, &udp)
}

pub fn tcp6(src: Ipv6Addr, dst_port: u16) -> Vec<u8> {
    let tcp = TcpBuilder::new().src_port(40000).dst_port(dst_port).build();
    ipv6(src, ip_proto::TCP, &tcp)
}

pub fn arp(payload: &[u8]) -> Vec<u8> {
    FrameBuilder::new()
        .ethertype(EtherType::Arp as u16)
        .payload(payload)
        .build()
}
