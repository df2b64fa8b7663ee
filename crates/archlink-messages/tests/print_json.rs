//! Decoding `PrintJSON` packets straight off the wire.

use std::sync::{Arc, Mutex};

use archlink_bounce::{PacketDispatcher, PacketListener};
use archlink_messages::{
    Color, LogDecoder, LogMessage, LogMessageKind, MessagePartKind, PartResolver,
};
use archlink_protocol::memory::{Identity, NameCatalog, Roster};
use archlink_protocol::{ItemFlags, PlayerInfo, Slot, Team};

fn setup() -> (PacketDispatcher, Arc<Mutex<Vec<LogMessage>>>) {
    let roster = Roster::new()
        .with_player(PlayerInfo {
            team: Team(0),
            slot: Slot(3),
            name: "Link".into(),
            alias: "Link".into(),
            game: "Zelda".into(),
            ..PlayerInfo::default()
        })
        .with_player(PlayerInfo {
            team: Team(0),
            slot: Slot(4),
            name: "Samus".into(),
            alias: "Samus".into(),
            game: "Metroid".into(),
            ..PlayerInfo::default()
        });
    let catalog = Arc::new(
        NameCatalog::new()
            .with_item("Zelda", 42, "Sword")
            .with_location("Metroid", 9, "Chozo Statue"),
    );
    let decoder = Arc::new(LogDecoder::new(PartResolver::new(
        Arc::new(roster),
        catalog.clone(),
        catalog,
        Arc::new(Identity::new(Team(0), Slot(3))),
    )));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    decoder.on_log_message(Arc::new(move |m: &LogMessage| {
        sink.lock().unwrap().push(m.clone());
    }));

    let dispatcher = PacketDispatcher::new();
    let listener: Arc<dyn PacketListener> = decoder;
    dispatcher.subscribe(listener);
    (dispatcher, seen)
}

#[test]
fn test_item_send_line() {
    let (dispatcher, seen) = setup();

    dispatcher
        .dispatch(
            r#"[{"cmd":"PrintJSON","type":"ItemSend","receiving":3,
                 "item":{"item":42,"location":9,"player":4,"flags":1},
                 "data":[
                   {"type":"player_id","text":"4"},
                   {"text":" sent "},
                   {"type":"item_id","text":"42","player":3,"flags":1},
                   {"text":" to "},
                   {"type":"player_id","text":"3"},
                   {"text":" ("},
                   {"type":"location_id","text":"9","player":4},
                   {"text":")"}
                 ]}]"#,
        )
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let message = &seen[0];
    assert_eq!(message.to_string(), "Samus sent Sword to Link (Chozo Statue)");

    assert_eq!(message.parts[0].color, Color::YELLOW);
    assert_eq!(message.parts[2].color, Color::PLUM);
    assert_eq!(
        message.parts[2].kind,
        MessagePartKind::Item { id: 42, flags: ItemFlags::ADVANCEMENT }
    );
    assert_eq!(message.parts[4].color, Color::MAGENTA);
    assert_eq!(message.parts[6].color, Color::GREEN);

    let item = message.item().unwrap();
    assert_eq!(item.name, "Sword");
    assert_eq!(item.sender, Slot(4));
    assert!(message.player().unwrap().is_active_player);
}

#[test]
fn test_unknown_ids_render_placeholders() {
    let (dispatcher, seen) = setup();

    dispatcher
        .dispatch(
            r#"[{"cmd":"PrintJSON","data":[
                 {"type":"item_id","text":"77","player":4},
                 {"text":" @ "},
                 {"type":"location_id","text":"5","player":4}
               ]}]"#,
        )
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].to_string(), "Item: 77 @ Location: 5");
    assert_eq!(seen[0].kind, LogMessageKind::Plain);
}

#[test]
fn test_wire_colors_by_index_and_name() {
    let (dispatcher, seen) = setup();

    dispatcher
        .dispatch(
            r#"[{"cmd":"PrintJSON","type":"Tutorial","data":[
                 {"type":"color","text":"a","color":1},
                 {"type":"color","text":"b","color":"blue_bg"},
                 {"type":"color","text":"c","color":"nonsense"},
                 {"type":"hint_status","text":"d","hint_status":30}
               ]}]"#,
        )
        .unwrap();

    let seen = seen.lock().unwrap();
    let parts = &seen[0].parts;
    assert_eq!((parts[0].color, parts[0].is_background), (Color::RED, false));
    assert_eq!((parts[1].color, parts[1].is_background), (Color::BLUE, true));
    assert_eq!(parts[2].color, Color::WHITE);
    assert_eq!(parts[3].color, Color::PLUM);
    assert_eq!(seen[0].kind, LogMessageKind::Tutorial);
}

#[test]
fn test_unknown_print_json_type_is_plain() {
    let (dispatcher, seen) = setup();

    dispatcher
        .dispatch(r#"[{"cmd":"PrintJSON","type":"SomethingNew","data":[{"text":"hi"}]}]"#)
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].kind, LogMessageKind::Plain);
    assert_eq!(seen[0].to_string(), "hi");
}
