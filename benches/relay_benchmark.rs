use chat_relay::{Envelope, Identity, InboundEvent, OutboundEvent, Relay};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::sync::mpsc::{self, UnboundedReceiver};

const MEMBERS: usize = 100;

fn drain(inboxes: &mut [UnboundedReceiver<OutboundEvent>]) {
    for inbox in inboxes.iter_mut() {
        while inbox.try_recv().is_ok() {}
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let relay = Relay::default();
    let mut inboxes = Vec::with_capacity(MEMBERS);
    let mut sender = None;
    runtime.block_on(async {
        for n in 0..MEMBERS {
            let (tx, rx) = mpsc::unbounded_channel();
            let id = relay.connect(tx).await;
            let who = Identity::new(format!("user{}", n), id.to_string());
            relay
                .handle(
                    id,
                    InboundEvent::Join {
                        room: "benchmark".to_owned(),
                        who: who.clone(),
                    },
                )
                .await;
            sender.get_or_insert((id, who));
            inboxes.push(rx);
        }
    });
    drain(&mut inboxes);

    let (id, who) = sender.unwrap();
    c.bench_function("room fan-out to 100 members", |b| {
        b.iter(|| {
            let event = InboundEvent::Message(Envelope::to_room(
                "benchmark",
                "hello, world",
                who.clone(),
            ));
            black_box(runtime.block_on(relay.handle(id, event)));
            drain(&mut inboxes);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
