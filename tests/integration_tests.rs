//! Integration tests for networked multiplayer components
//!
//! These tests validate cross-component interactions and real network behavior.

use bincode::{deserialize, serialize};
use shared::{now_ms, InputSample, Packet};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests packet serialization round-trip for network protocol validation
    #[tokio::test]
    async fn packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::Connect { client_version: 1 },
            Packet::Input {
                sample: InputSample {
                    sequence: 42,
                    timestamp: 123456789,
                    axis: -1.0,
                    jump: true,
                },
            },
            Packet::Connected { client_id: 42 },
            Packet::Disconnected {
                reason: "Test".to_string(),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();

            match (&packet, &deserialized) {
                (Packet::Connect { .. }, Packet::Connect { .. }) => {}
                (Packet::Input { sample: a }, Packet::Input { sample: b }) => {
                    assert_eq!(a, b);
                }
                (Packet::Connected { .. }, Packet::Connected { .. }) => {}
                (Packet::Disconnected { .. }, Packet::Disconnected { .. }) => {}
                _ => panic!("Packet type mismatch after serialization"),
            }
        }
    }

    /// Tests real UDP socket communication
    #[tokio::test]
    async fn udp_socket_communication() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();

        // Echo server
        let server_socket_clone = server_socket.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = [0; 1024];
            if let Ok((size, client_addr)) = server_socket_clone.recv_from(&mut buf) {
                let _ = server_socket_clone.send_to(&buf[..size], client_addr);
            }
        });

        sleep(Duration::from_millis(10)).await;

        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        client_socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let test_packet = Packet::Connect { client_version: 1 };
        let serialized = serialize(&test_packet).unwrap();

        client_socket.send_to(&serialized, server_addr).unwrap();

        let mut buf = [0; 1024];
        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let received_packet: Packet = deserialize(&buf[..size]).unwrap();

        match received_packet {
            Packet::Connect { client_version } => assert_eq!(client_version, 1),
            _ => panic!("Unexpected packet type"),
        }
    }

    /// Tests malformed data is rejected rather than misparsed
    #[test]
    fn malformed_packet_rejected() {
        let garbage = [0xFFu8; 32];
        let result: Result<Packet, _> = deserialize(&garbage);
        assert!(result.is_err());
    }
}

/// LIVE SERVER TESTS
mod server_tests {
    use super::*;
    use server::network::Server;

    async fn recv_packet(socket: &tokio::net::UdpSocket) -> Packet {
        let mut buf = [0u8; 2048];
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for server")
            .expect("socket error");
        deserialize(&buf[..len]).expect("undecodable packet from server")
    }

    /// Full connect / input / acknowledge / disconnect cycle against a
    /// running server.
    #[tokio::test]
    async fn connect_input_state_cycle() {
        let server = Server::new("127.0.0.1:0", Duration::from_millis(16), 4)
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut server = server;
            let _ = server.run().await;
        });

        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let connect = serialize(&Packet::Connect { client_version: 1 }).unwrap();
        socket.send_to(&connect, server_addr).await.unwrap();

        let client_id = match recv_packet(&socket).await {
            Packet::Connected { client_id } => client_id,
            other => panic!("Expected Connected, got {:?}", other),
        };

        let input = serialize(&Packet::Input {
            sample: InputSample {
                sequence: 1,
                timestamp: now_ms(),
                axis: 1.0,
                jump: false,
            },
        })
        .unwrap();
        socket.send_to(&input, server_addr).await.unwrap();

        // The server ticks at 60Hz; within a few packets we must see our
        // own state with the input acknowledged.
        let mut acked = false;
        for _ in 0..120 {
            if let Packet::State { player_id, state } = recv_packet(&socket).await {
                assert_eq!(player_id, client_id);
                if state.last_input_seq == 1 {
                    acked = true;
                    break;
                }
            }
        }
        assert!(acked, "input was never acknowledged");

        let disconnect = serialize(&Packet::Disconnect).unwrap();
        socket.send_to(&disconnect, server_addr).await.unwrap();
    }

    /// A server at capacity must refuse further connections explicitly.
    #[tokio::test]
    async fn server_full_rejects_connection() {
        let server = Server::new("127.0.0.1:0", Duration::from_millis(16), 1)
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut server = server;
            let _ = server.run().await;
        });

        let first = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let connect = serialize(&Packet::Connect { client_version: 1 }).unwrap();
        first.send_to(&connect, server_addr).await.unwrap();
        match recv_packet(&first).await {
            Packet::Connected { .. } => {}
            other => panic!("Expected Connected, got {:?}", other),
        }

        let second = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        second.send_to(&connect, server_addr).await.unwrap();
        match recv_packet(&second).await {
            Packet::Disconnected { reason } => assert_eq!(reason, "Server full"),
            other => panic!("Expected Disconnected, got {:?}", other),
        }
    }
}

/// CROSS-SIDE DETERMINISM TESTS
mod determinism_tests {
    use shared::{
        default_world, InputSample, KinematicMotor, MotionState, MotorSettings, Vec2, FIXED_DT,
        SPAWN_Y,
    };

    /// The same input stream through two independently constructed motors
    /// must land in exactly the same place. Everything else in the netcode
    /// leans on this.
    #[test]
    fn identical_inputs_identical_trajectories() {
        let world = default_world();
        let spawn = Vec2::new(400.0, SPAWN_Y);

        let mut a = KinematicMotor::new(MotionState::at(spawn), MotorSettings::default());
        let mut b = KinematicMotor::new(MotionState::at(spawn), MotorSettings::default());

        for tick in 0..240u32 {
            let sample = InputSample {
                sequence: tick + 1,
                timestamp: tick as u64 * 16,
                axis: if tick % 90 < 45 { 1.0 } else { -1.0 },
                jump: tick % 75 == 30,
            };
            a.step(&sample, &world, FIXED_DT);
            b.step(&sample, &world, FIXED_DT);

            assert_eq!(a.state.position, b.state.position);
            assert_eq!(a.state.velocity, b.state.velocity);
            assert_eq!(a.state.grounded, b.state.grounded);
        }
    }
}
