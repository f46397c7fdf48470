//! End-to-end sessions against the in-process authority.

use collab_client::{
    ClientConfig, ClientEvent, CollabClient, LoopbackAuthority, LoopbackTransport, Transport,
};
use collab_types::{ClientId, Message, Submission, TextStep, Version};
use std::time::Duration;

type Client = CollabClient<TextStep, LoopbackTransport<TextStep>>;

async fn join(authority: &LoopbackAuthority<TextStep>, id: u32) -> Client {
    let config = ClientConfig::default()
        .with_client_id(id)
        .with_start_version(authority.version().value())
        .with_poll_timeout(Duration::from_millis(20));
    let client = Client::new(config, authority.doc(), authority.transport()).unwrap();
    client.connect().await.unwrap();
    client
}

/// Poll every client until nobody receives anything, flushing along the way.
async fn settle(clients: &[&Client]) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    loop {
        let mut quiet = true;
        for client in clients {
            client.flush().await.unwrap();
            while let Some(event) = client.poll_timeout().await.unwrap() {
                events.push(event);
                quiet = false;
            }
        }
        if quiet {
            return events;
        }
    }
}

#[tokio::test]
async fn concurrent_edits_converge() {
    let authority = LoopbackAuthority::<TextStep>::new("hello".to_string());
    let a = join(&authority, 1).await;
    let b = join(&authority, 2).await;

    a.edit(vec![TextStep::insert(0, "A: ")]).await.unwrap();
    b.edit(vec![TextStep::insert(5, " world")]).await.unwrap();
    a.flush().await.unwrap();
    b.flush().await.unwrap();

    let events = settle(&[&a, &b]).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, ClientEvent::Rejected { .. })));
    assert_eq!(authority.doc(), "A: hello world");
    for client in [&a, &b] {
        assert_eq!(client.doc().await, authority.doc());
        assert_eq!(client.version().await, authority.version());
        assert!(client.is_synced().await);
    }
}

#[tokio::test]
async fn late_joiner_starts_from_current_version() {
    let authority = LoopbackAuthority::<TextStep>::new(String::new());
    let a = join(&authority, 1).await;
    a.edit(vec![TextStep::insert(0, "abc")]).await.unwrap();
    settle(&[&a]).await;

    let b = join(&authority, 2).await;
    assert_eq!(b.version().await, Version::new(1));

    b.edit(vec![TextStep::delete(0, 1)]).await.unwrap();
    a.edit(vec![TextStep::insert(3, "!")]).await.unwrap();
    settle(&[&a, &b]).await;

    assert_eq!(authority.doc(), "bc!");
    assert_eq!(a.doc().await, "bc!");
    assert_eq!(b.doc().await, "bc!");
}

#[tokio::test]
async fn many_rounds_of_interleaved_edits() {
    let authority = LoopbackAuthority::<TextStep>::new("0123456789".to_string());
    let a = join(&authority, 1).await;
    let b = join(&authority, 2).await;
    let c = join(&authority, 3).await;

    for round in 0..10usize {
        for (i, client) in [&a, &b, &c].into_iter().enumerate() {
            let len = client.doc().await.chars().count();
            let pos = (round * 7 + i * 3) % (len + 1);
            let step = if (round + i) % 3 == 0 && pos < len {
                TextStep::delete(pos, pos + 1)
            } else {
                TextStep::insert(pos, i.to_string())
            };
            client.edit(vec![step]).await.unwrap();
            client.flush().await.unwrap();
        }
        // Only partially drain so edits pile up against stale versions.
        for client in [&a, &b, &c] {
            client.poll_timeout().await.unwrap();
        }
    }
    settle(&[&a, &b, &c]).await;

    let expected = authority.doc();
    for client in [&a, &b, &c] {
        assert_eq!(client.doc().await, expected);
        assert_eq!(client.version().await, authority.version());
        assert!(client.is_synced().await);
    }
}

#[tokio::test]
async fn raw_participant_steps_are_integrated() {
    let authority = LoopbackAuthority::<TextStep>::new("xyz".to_string());
    let a = join(&authority, 1).await;

    // A participant speaking the wire protocol directly.
    let other = authority.transport();
    other.connect("loopback").await.unwrap();
    let submit = Message::Submit(Submission {
        version: Version::zero(),
        steps: vec![TextStep::insert(0, "w")],
        client_id: ClientId::new(9).unwrap(),
    });
    other.send(&submit.to_bytes().unwrap()).await.unwrap();

    a.edit(vec![TextStep::insert(3, "!")]).await.unwrap();
    let event = a.poll().await.unwrap();
    assert_eq!(
        event,
        ClientEvent::Applied {
            version: Version::new(1),
            confirmed: 0,
            remote: 1,
            dropped: 0
        }
    );
    assert_eq!(a.pending().await, 1);

    settle(&[&a]).await;
    assert_eq!(a.doc().await, "wxyz!");
    assert_eq!(authority.doc(), "wxyz!");

    // The raw participant got both broadcasts.
    for expected in [Version::zero(), Version::new(1)] {
        match Message::<TextStep>::from_bytes(&other.recv().await.unwrap()).unwrap() {
            Message::Broadcast(batch) => assert_eq!(batch.version, expected),
            msg => panic!("Expected Broadcast, got {:?}", msg),
        }
    }
}

#[tokio::test]
async fn resync_through_loopback_restores_authoritative_doc() {
    let authority = LoopbackAuthority::<TextStep>::new("abc".to_string());
    let a = join(&authority, 1).await;
    let b = join(&authority, 2).await;

    b.edit(vec![TextStep::insert(0, ">")]).await.unwrap();
    settle(&[&b]).await;

    // Joins claiming version 0 after the first step was already broadcast,
    // so it never sees that step.
    let stale = CollabClient::<TextStep, _>::new(
        ClientConfig::default()
            .with_client_id(3)
            .with_start_version(0)
            .with_poll_timeout(Duration::from_millis(20)),
        "abc".to_string(),
        authority.transport(),
    )
    .unwrap();
    stale.connect().await.unwrap();
    stale.edit(vec![TextStep::insert(3, "?")]).await.unwrap();
    stale.flush().await.unwrap();

    let mut saw_rejection = false;
    while let Some(event) = stale.poll_timeout().await.unwrap() {
        saw_rejection |= matches!(event, ClientEvent::Rejected { .. });
    }
    assert!(saw_rejection);

    a.edit(vec![TextStep::insert(3, ".")]).await.unwrap();
    settle(&[&a]).await;

    // The broadcast extending version 1 arrives while `stale` is at 0.
    let event = stale.poll_timeout().await.unwrap().unwrap();
    assert!(matches!(event, ClientEvent::ResyncRequested { .. }));
    let event = stale.poll_timeout().await.unwrap().unwrap();
    assert_eq!(
        event,
        ClientEvent::Resynced {
            version: authority.version()
        }
    );
    assert_eq!(stale.doc().await, authority.doc());
    assert_eq!(stale.doc().await, ">abc.");
}
