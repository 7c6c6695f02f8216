//! Integration tests for snake sessions
//!
//! These tests drive full host and client machines over the loopback
//! transport and check what every peer ends up seeing.

use session::demo::{Demo, DemoOptions};
use session::{RunSummary, ScriptedEngine, SessionError, SessionMachine};
use shared::loopback::{LoopbackHub, LoopbackTransport};
use shared::naming::namespace_id;
use shared::{
    Direction, GameMessage, GameMode, Position, SessionConfig, SessionState, TransportError,
    TurnBattleMode,
};

type Machine = SessionMachine<LoopbackTransport, ScriptedEngine>;

fn machine(hub: &LoopbackHub, config: &SessionConfig, engine: ScriptedEngine) -> Machine {
    let transport = hub.connect(&namespace_id(&config.team_tag));
    SessionMachine::new(config.clone(), transport, engine).with_seed(42)
}

fn host(hub: &LoopbackHub, config: &SessionConfig, mode: GameMode) -> Machine {
    host_with(hub, config, mode, ScriptedEngine::default())
}

fn host_with(
    hub: &LoopbackHub,
    config: &SessionConfig,
    mode: GameMode,
    engine: ScriptedEngine,
) -> Machine {
    let mut m = machine(hub, config, engine);
    m.enter_name("Host").unwrap();
    m.host_game("Den", mode, 0).unwrap();
    m
}

fn join(hub: &LoopbackHub, config: &SessionConfig, name: &str) -> Machine {
    join_with(hub, config, name, ScriptedEngine::default())
}

fn join_with(
    hub: &LoopbackHub,
    config: &SessionConfig,
    name: &str,
    engine: ScriptedEngine,
) -> Machine {
    let mut m = machine(hub, config, engine);
    m.enter_name(name).unwrap();
    m.open_browser().unwrap();
    let id = m.refresh_browser().unwrap()[0].id.clone();
    m.join_game(&id).unwrap();
    m
}

fn frame_all(host: &mut Machine, clients: &mut [Machine], now_ms: u64) {
    host.frame(now_ms);
    for client in clients.iter_mut() {
        client.frame(now_ms);
    }
}

fn runs(scores: [u32; 3]) -> ScriptedEngine {
    ScriptedEngine::new(scores.map(|score| RunSummary {
        score,
        length: 3 + score / 10,
        survival_ms: 500,
    }))
}

/// LOBBY TESTS
mod lobby_tests {
    use super::*;

    #[test]
    fn client_joins_through_browser_and_sees_roster() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host(&hub, &config, GameMode::TurnBattle);
        let mut clients = vec![join(&hub, &config, "Guest")];

        frame_all(&mut host, &mut clients, 0);

        let host_ctx = host.context().unwrap();
        assert_eq!(host_ctx.joined_count(), 2);
        assert_eq!(host_ctx.players[1].name, "Guest");

        let client_ctx = clients[0].context().unwrap();
        assert_eq!(clients[0].state(), SessionState::Lobby);
        assert_eq!(client_ctx.local_player_index, 1);
        assert_eq!(client_ctx.players[0].name, "Host");
        assert!(client_ctx.players[0].is_host);
        assert_eq!(client_ctx.game_mode, GameMode::TurnBattle);
    }

    #[test]
    fn nickname_and_chat_reach_every_peer() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host(&hub, &config, GameMode::RealTime);
        let mut clients = vec![join(&hub, &config, "Guest"), join(&hub, &config, "Other")];
        frame_all(&mut host, &mut clients, 0);

        clients[0].open_nick().unwrap();
        clients[0].change_nick("Viper").unwrap();
        clients[1].open_chat().unwrap();
        clients[1].send_chat("hello all").unwrap();
        frame_all(&mut host, &mut clients, 10);
        frame_all(&mut host, &mut clients, 20);

        assert_eq!(host.context().unwrap().players[1].name, "Viper");
        assert_eq!(clients[1].context().unwrap().players[1].name, "Viper");
        for peer in [&host, &clients[0]] {
            let chat = &peer.context().unwrap().chat;
            let line = chat.lines().last().unwrap();
            assert_eq!(line.name, "Other");
            assert_eq!(line.text, "hello all");
        }
    }

    #[test]
    fn full_session_rejects_extra_player() {
        let hub = LoopbackHub::new();
        let config = SessionConfig {
            max_players: 2,
            ..SessionConfig::default()
        };
        let _host = host(&hub, &config, GameMode::RealTime);
        let _guest = join(&hub, &config, "Guest");

        let mut late = machine(&hub, &config, ScriptedEngine::default());
        late.open_browser().unwrap();
        let listed = late.refresh_browser().unwrap()[0].clone();
        assert!(listed.is_full());

        let err = late.join_game(&listed.id).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::SessionFull(_))
        ));
        assert_eq!(late.state(), SessionState::Disconnected);
        assert!(late.context().is_none());
    }

    #[test]
    fn client_leaving_frees_the_slot() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host(&hub, &config, GameMode::RealTime);
        let mut clients = vec![join(&hub, &config, "Guest"), join(&hub, &config, "Other")];
        frame_all(&mut host, &mut clients, 0);

        clients[0].leave();
        frame_all(&mut host, &mut clients, 10);

        assert_eq!(host.context().unwrap().joined_count(), 2);
        assert!(!host.context().unwrap().players[1].joined);
        assert!(!clients[1].context().unwrap().players[1].joined);
        assert_eq!(clients[0].state(), SessionState::Disconnected);
    }

    #[test]
    fn host_leaving_disconnects_clients() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host(&hub, &config, GameMode::RealTime);
        let mut clients = vec![join(&hub, &config, "Guest")];
        frame_all(&mut host, &mut clients, 0);

        host.leave();
        clients[0].frame(10);

        assert_eq!(clients[0].state(), SessionState::Disconnected);
        assert!(clients[0].context().is_none());
        assert!(clients[0].last_error().is_some());

        clients[0].acknowledge_disconnect();
        assert_eq!(clients[0].state(), SessionState::Menu);
    }
}

/// REAL-TIME ROUND TESTS
mod realtime_tests {
    use super::*;

    /// Hosts, joins one client and runs both into Playing. The host's
    /// movement clock is armed at 3_100.
    fn playing(config: &SessionConfig) -> (LoopbackHub, Machine, Vec<Machine>) {
        let hub = LoopbackHub::new();
        let mut host = host(&hub, config, GameMode::RealTime);
        let mut clients = vec![join(&hub, config, "Guest")];
        frame_all(&mut host, &mut clients, 0);

        host.start_game(100).unwrap();
        frame_all(&mut host, &mut clients, 116);
        assert_eq!(host.state(), SessionState::Countdown);
        assert_eq!(clients[0].state(), SessionState::Countdown);

        frame_all(&mut host, &mut clients, 3_100);
        (hub, host, clients)
    }

    #[test]
    fn countdown_leads_both_peers_into_playing() {
        let (_hub, host, clients) = playing(&SessionConfig::default());

        assert_eq!(host.state(), SessionState::Playing);
        assert_eq!(clients[0].state(), SessionState::Playing);
        let mirror = clients[0].context().unwrap();
        assert_eq!(mirror.players[0].snake.head(), Some(Position::new(10, 15)));
        assert_eq!(mirror.players[1].snake.head(), Some(Position::new(30, 15)));
    }

    #[test]
    fn client_direction_is_applied_by_host() {
        let (_hub, mut host, mut clients) = playing(&SessionConfig::default());

        assert!(clients[0].queue_direction(Direction::Up));
        // Reversing into its own body is refused before anything is sent.
        assert!(!clients[0].queue_direction(Direction::Right));
        frame_all(&mut host, &mut clients, 3_116);
        frame_all(&mut host, &mut clients, 3_250);

        let host_ctx = host.context().unwrap();
        assert_eq!(host_ctx.players[1].snake.head(), Some(Position::new(30, 14)));
        assert_eq!(host_ctx.players[0].snake.head(), Some(Position::new(11, 15)));
        let mirror = clients[0].context().unwrap();
        assert_eq!(mirror.players[1].snake.head(), Some(Position::new(30, 14)));
        assert_eq!(mirror.players[1].snake.direction, Direction::Up);
    }

    #[test]
    fn buffered_dispatch_plays_the_same_round() {
        let config = SessionConfig {
            buffered_dispatch: true,
            ..SessionConfig::default()
        };
        let (_hub, mut host, mut clients) = playing(&config);
        assert_eq!(clients[0].state(), SessionState::Playing);

        clients[0].queue_direction(Direction::Down);
        frame_all(&mut host, &mut clients, 3_250);

        let mirror = clients[0].context().unwrap();
        assert_eq!(mirror.players[1].snake.head(), Some(Position::new(30, 16)));
        assert_eq!(host.dropped_messages(), 0);
    }

    #[test]
    fn crash_ends_round_and_host_can_restart() {
        let (_hub, mut host, mut clients) = playing(&SessionConfig::default());

        // Steer the guest into the top wall: 15 moves up.
        let mut now = 3_100;
        while host.state() == SessionState::Playing && now < 20_000 {
            clients[0].queue_direction(Direction::Up);
            now += 16;
            frame_all(&mut host, &mut clients, now);
        }

        assert_eq!(host.state(), SessionState::GameOver);
        assert_eq!(clients[0].state(), SessionState::GameOver);
        let host_ctx = host.context().unwrap();
        assert!(!host_ctx.players[1].alive);
        assert_eq!(host_ctx.winner, Some(0));
        assert_eq!(clients[0].context().unwrap().winner, Some(0));

        host.restart(now).unwrap();
        frame_all(&mut host, &mut clients, now + 16);
        assert_eq!(host.state(), SessionState::Countdown);
        assert_eq!(clients[0].state(), SessionState::Countdown);
        assert!(clients[0].context().unwrap().players[1].alive);
    }
}

/// HOST SIMULATION TESTS
mod host_tests {
    use super::*;
    use host::HostSimulation;
    use shared::SessionContext;

    #[test]
    fn eating_food_on_a_movement_tick() {
        let config = SessionConfig::default();
        let mut ctx = SessionContext::new(&config, true);
        ctx.players[0].occupy("a", "alpha", true);
        ctx.players[1].occupy("b", "beta", false);
        ctx.prepare_round(&config);
        ctx.state = SessionState::Playing;
        ctx.current_speed_ms = 100;
        let target = ctx.players[0].snake.next_head().unwrap();
        ctx.food[0] = target;

        let mut sim = HostSimulation::new(9);
        sim.tick(&mut ctx, 0, &config);
        let outcome = sim.tick(&mut ctx, 100, &config);

        assert!(outcome.moved);
        let player = &ctx.players[0];
        assert_eq!(player.score, 10);
        assert_eq!(player.snake.length, 4);
        assert_eq!(player.snake.head(), Some(target));
        assert_eq!(ctx.current_speed_ms, 95);
        assert_ne!(ctx.food[0], target);
        assert!(ctx
            .players
            .iter()
            .filter(|slot| slot.joined)
            .all(|slot| !slot.snake.occupies(ctx.food[0])));
    }

    #[test]
    fn speed_never_drops_below_floor() {
        let config = SessionConfig::default();
        let mut speed = config.base_speed_ms;
        for _ in 0..100 {
            speed = config.faster(speed);
        }
        assert_eq!(speed, config.min_speed_ms);
    }
}

/// TURN BATTLE TESTS
mod turn_battle_tests {
    use super::*;

    fn play_out(host: &mut Machine, clients: &mut [Machine]) {
        frame_all(host, clients, 0);
        host.start_game(0).unwrap();
        frame_all(host, clients, 10);
        assert!(clients.iter().all(|c| c.state() == SessionState::ReadyUp));

        host.set_ready(true, 20).unwrap();
        for client in clients.iter_mut() {
            client.set_ready(true, 20).unwrap();
        }
        frame_all(host, clients, 30);
        assert_eq!(host.state(), SessionState::Countdown);

        let mut now = 30;
        while host.state() != SessionState::TurnResults && now < 120_000 {
            now += 50;
            frame_all(host, clients, now);
        }
        frame_all(host, clients, now + 50);
    }

    #[test]
    fn every_peer_sees_the_same_ranking() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host_with(&hub, &config, GameMode::TurnBattle, runs([30, 50, 20]));
        let mut clients = vec![
            join_with(&hub, &config, "Ace", runs([70, 10, 10])),
            join_with(&hub, &config, "Steady", runs([40, 40, 40])),
        ];

        play_out(&mut host, &mut clients);

        for peer in std::iter::once(&host).chain(clients.iter()) {
            assert_eq!(peer.state(), SessionState::TurnResults);
            let ctx = peer.context().unwrap();
            assert_eq!(ctx.results, vec![1, 0, 2]);
            assert_eq!(ctx.winner, Some(1));
            assert_eq!(ctx.players[0].best_score, 50);
            assert_eq!(ctx.players[1].best_score, 70);
            assert_eq!(ctx.players[2].best_score, 40);
            assert_eq!(ctx.players[1].attempts[0].score, 70);
        }
    }

    #[test]
    fn ruleset_and_map_reach_client_engines() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host_with(&hub, &config, GameMode::TurnBattle, runs([10, 10, 10]));
        host.open_mode_select().unwrap();
        host.set_mode(GameMode::TurnBattle, TurnBattleMode::PowerUp, 3).unwrap();
        let mut clients = vec![join_with(&hub, &config, "Guest", runs([20, 20, 20]))];

        play_out(&mut host, &mut clients);

        assert_eq!(
            clients[0].engine().starts,
            vec![(TurnBattleMode::PowerUp, 3); 3]
        );
    }

    #[test]
    fn tied_best_scores_follow_tie_break() {
        use shared::TieBreak;

        for (tie_break, expected) in [(TieBreak::FirstSeenSlot, Some(0)), (TieBreak::Draw, None)] {
            let hub = LoopbackHub::new();
            let config = SessionConfig {
                tie_break,
                ..SessionConfig::default()
            };
            let mut host = host_with(&hub, &config, GameMode::TurnBattle, runs([60, 0, 0]));
            let mut clients = vec![join_with(&hub, &config, "Twin", runs([0, 60, 0]))];

            play_out(&mut host, &mut clients);

            assert_eq!(host.context().unwrap().winner, expected);
            assert_eq!(clients[0].context().unwrap().winner, expected);
        }
    }

    #[test]
    fn ready_up_starts_once_host_closes_chat() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host(&hub, &config, GameMode::TurnBattle);
        let mut clients = vec![join(&hub, &config, "Guest")];
        frame_all(&mut host, &mut clients, 0);
        host.start_game(0).unwrap();
        frame_all(&mut host, &mut clients, 10);

        host.set_ready(true, 20).unwrap();
        host.open_chat().unwrap();
        clients[0].set_ready(true, 20).unwrap();
        frame_all(&mut host, &mut clients, 30);
        assert_eq!(host.state(), SessionState::Chatting);
        assert!(host.context().unwrap().all_ready());

        host.send_chat("ready when you are").unwrap();
        assert_eq!(host.state(), SessionState::ReadyUp);
        frame_all(&mut host, &mut clients, 40);
        frame_all(&mut host, &mut clients, 50);

        assert_eq!(host.state(), SessionState::Countdown);
        assert_eq!(clients[0].state(), SessionState::Countdown);
    }

    #[test]
    fn leaving_mid_wait_publishes_results() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let stalling = ScriptedEngine::new([RunSummary {
            score: 0,
            length: 3,
            survival_ms: 10_000_000,
        }; 3]);
        let mut host = host_with(&hub, &config, GameMode::TurnBattle, runs([10, 20, 30]));
        let mut clients = vec![
            join_with(&hub, &config, "Quick", runs([40, 40, 40])),
            join_with(&hub, &config, "Slow", stalling),
        ];
        frame_all(&mut host, &mut clients, 0);
        host.start_game(0).unwrap();
        frame_all(&mut host, &mut clients, 10);
        host.set_ready(true, 20).unwrap();
        for client in clients.iter_mut() {
            client.set_ready(true, 20).unwrap();
        }

        let mut now = 30;
        while now < 120_000
            && !(host.state() == SessionState::TurnWaiting
                && clients[0].state() == SessionState::TurnWaiting)
        {
            now += 50;
            frame_all(&mut host, &mut clients, now);
        }
        assert_eq!(host.state(), SessionState::TurnWaiting);
        assert_eq!(clients[1].state(), SessionState::TurnPlaying);

        clients[1].leave();
        frame_all(&mut host, &mut clients[..1], now + 50);
        frame_all(&mut host, &mut clients[..1], now + 100);

        for peer in [&host, &clients[0]] {
            assert_eq!(peer.state(), SessionState::TurnResults);
            let ctx = peer.context().unwrap();
            assert_eq!(ctx.results, vec![1, 0]);
            assert_eq!(ctx.winner, Some(1));
        }
    }

    #[test]
    fn return_to_lobby_resets_attempts_everywhere() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host_with(&hub, &config, GameMode::TurnBattle, runs([10, 20, 30]));
        let mut clients = vec![join_with(&hub, &config, "Guest", runs([5, 5, 5]))];
        play_out(&mut host, &mut clients);

        host.return_to_lobby().unwrap();
        frame_all(&mut host, &mut clients, 200_000);

        for peer in std::iter::once(&host).chain(clients.iter()) {
            assert_eq!(peer.state(), SessionState::Lobby);
            let ctx = peer.context().unwrap();
            assert!(ctx.results.is_empty());
            assert_eq!(ctx.players[1].completed_attempts, 0);
        }
    }
}

/// STRESS TESTS
mod stress_tests {
    use super::*;

    #[test]
    fn full_queue_drops_newest_envelopes() {
        let hub = LoopbackHub::new();
        let config = SessionConfig {
            buffered_dispatch: true,
            queue_capacity: 4,
            ..SessionConfig::default()
        };
        let mut host = host(&hub, &config, GameMode::RealTime);
        let mut clients = vec![join(&hub, &config, "Guest")];
        frame_all(&mut host, &mut clients, 0);

        for i in 0..10 {
            clients[0].open_chat().unwrap();
            clients[0].send_chat(&format!("line {}", i)).unwrap();
        }
        host.frame(10);

        let chat = &host.context().unwrap().chat;
        assert_eq!(chat.len(), 4);
        assert_eq!(chat.lines().last().unwrap().text, "line 3");
        assert_eq!(host.dropped_messages(), 6);
    }

    #[test]
    fn garbage_documents_do_not_disturb_the_session() {
        use shared::Transport;

        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut host = host(&hub, &config, GameMode::RealTime);
        let mut rogue = hub.connect(&namespace_id(&config.team_tag));
        let session_id = host.context().unwrap().session_id.clone();
        rogue
            .join(&session_id, &shared::SessionMetadata::default())
            .unwrap();

        for doc in [
            serde_json::json!({"type": "warp", "to": 3}),
            serde_json::json!({"ready": true}),
            serde_json::json!(17),
            GameMessage::HostDisconnect.to_document(),
            GameMessage::ReturnToLobby.to_document(),
        ] {
            rogue.send_game_message(&doc).unwrap();
        }
        host.frame(0);

        assert_eq!(host.state(), SessionState::Lobby);
        assert_eq!(host.context().unwrap().joined_count(), 2);
    }

    #[test]
    fn buffered_host_ignores_documents_tagged_as_transport_events() {
        use shared::Transport;

        let hub = LoopbackHub::new();
        let config = SessionConfig {
            buffered_dispatch: true,
            ..SessionConfig::default()
        };
        let mut host = host(&hub, &config, GameMode::RealTime);
        let mut rogue = hub.connect(&namespace_id(&config.team_tag));
        let session_id = host.context().unwrap().session_id.clone();
        rogue
            .join(&session_id, &shared::SessionMetadata::default())
            .unwrap();
        host.frame(0);
        assert_eq!(host.context().unwrap().joined_count(), 2);

        for tag in ["leaved", "joined"] {
            rogue
                .send_game_message(&serde_json::json!({ "type": tag }))
                .unwrap();
        }
        host.frame(10);

        assert_eq!(host.state(), SessionState::Lobby);
        assert_eq!(host.context().unwrap().joined_count(), 2);
        assert_eq!(host.dropped_messages(), 0);
    }

    #[test]
    fn ten_player_turn_battle_demo_finishes() {
        let outcome = tokio_test::block_on(async {
            let mut demo = Demo::new(DemoOptions {
                bots: 9,
                mode: GameMode::TurnBattle,
                seed: 3,
                ..DemoOptions::default()
            })
            .unwrap();

            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(1));
            let mut now = 0;
            loop {
                ticker.tick().await;
                now += 50;
                if let Some(outcome) = demo.step(now) {
                    break Some(outcome);
                }
                if now > 300_000 {
                    break None;
                }
            }
        })
        .expect("demo never finished");

        assert_eq!(outcome.state, SessionState::TurnResults);
        assert_eq!(outcome.standings.len(), 10);
        assert!(outcome.winner.is_some());
    }
}
