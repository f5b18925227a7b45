use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{ConnectionId, RoomCode, Seat},
    error::ApiError,
    protocol::{ClientRequest, GameSnapshot, MoveCall, MoveReceipt, ReadySummary, ServerEvent},
};
use storage::{Departure, Play, RoomStore, StoreError};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Per-connection outgoing queues, keyed by the identity that owns them.
#[derive(Default)]
struct Outboxes {
    senders: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
}

impl Outboxes {
    fn open(&mut self, connection_id: ConnectionId) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(connection_id, tx);
        rx
    }

    fn close(&mut self, connection_id: ConnectionId) {
        self.senders.remove(&connection_id);
    }

    fn publish(&self, recipients: &[ConnectionId], event: ServerEvent) {
        for connection_id in recipients {
            let Some(tx) = self.senders.get(connection_id) else {
                continue;
            };
            if tx.send(event.clone()).is_err() {
                debug!(%connection_id, "outbox closed, event dropped");
            }
        }
    }

    fn announce_departure(&self, departure: &Departure) {
        info!(
            room_code = %departure.room_code,
            remaining = departure.remaining.len(),
            "player left room"
        );
        self.publish(&departure.remaining, ServerEvent::OpponentLeft);
    }
}

/// Everything an event turn may touch.
struct Hub {
    rooms: RoomStore,
    outboxes: Outboxes,
}

/// Shared handle to the room store and the connection outboxes.
///
/// Every operation holds the hub lock from first read to last publish,
/// which makes each inbound event one indivisible turn and keeps each
/// connection's queue in mutation order.
#[derive(Clone)]
pub struct ApiContext {
    hub: Arc<Mutex<Hub>>,
}

impl ApiContext {
    pub fn new(rooms: RoomStore) -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub {
                rooms,
                outboxes: Outboxes::default(),
            })),
        }
    }

    pub async fn room_count(&self) -> usize {
        self.hub.lock().await.rooms.room_count()
    }

    pub async fn connection_count(&self) -> usize {
        self.hub.lock().await.outboxes.senders.len()
    }
}

/// Registers the outbox of a freshly opened stream and greets it with the
/// identity it can claim later on the call path.
pub async fn connect(ctx: &ApiContext, connection_id: ConnectionId) -> EventReceiver {
    let mut hub = ctx.hub.lock().await;
    let rx = hub.outboxes.open(connection_id);
    hub.outboxes
        .publish(&[connection_id], ServerEvent::Connected { connection_id });
    rx
}

/// Tears down a closed stream: leaves its room, then drops its outbox.
pub async fn disconnect(ctx: &ApiContext, connection_id: ConnectionId) -> Option<Departure> {
    let mut hub = ctx.hub.lock().await;
    let Hub { rooms, outboxes } = &mut *hub;
    let departure = rooms.leave(connection_id);
    if let Some(departure) = &departure {
        outboxes.announce_departure(departure);
    }
    outboxes.close(connection_id);
    departure
}

/// Streaming-path entry point. Rejections go back to the requesting
/// connection as an error event and are also returned for logging.
pub async fn handle_request(
    ctx: &ApiContext,
    connection_id: ConnectionId,
    request: ClientRequest,
) -> Result<(), ApiError> {
    let result = match request {
        ClientRequest::CreateRoom => create_room(ctx, connection_id).await.map(|_| ()),
        ClientRequest::JoinRoom { room_code } => join_room(ctx, connection_id, &room_code)
            .await
            .map(|_| ()),
        ClientRequest::SetReady { ready } => {
            set_ready(ctx, connection_id, ready).await.map(|_| ())
        }
        ClientRequest::MakeMove { column, move_id } => {
            submit_move(ctx, connection_id, column, move_id)
                .await
                .map(|_| ())
        }
        ClientRequest::PlayAgain => play_again(ctx, connection_id).await.map(|_| ()),
        ClientRequest::LeaveRoom => {
            leave_room(ctx, connection_id).await;
            Ok(())
        }
    };
    if let Err(error) = &result {
        reject(ctx, connection_id, error.clone()).await;
    }
    result
}

/// Sends a failure notice to a single streaming connection.
pub async fn reject(ctx: &ApiContext, connection_id: ConnectionId, error: ApiError) {
    debug!(%connection_id, code = ?error.code, message = %error.message, "request rejected");
    let hub = ctx.hub.lock().await;
    hub.outboxes
        .publish(&[connection_id], ServerEvent::Error(error));
}

pub async fn create_room(ctx: &ApiContext, creator: ConnectionId) -> Result<RoomCode, ApiError> {
    let mut hub = ctx.hub.lock().await;
    let Hub { rooms, outboxes } = &mut *hub;
    let created = rooms.create_room(creator);
    if let Some(departure) = &created.departed {
        outboxes.announce_departure(departure);
    }
    outboxes.publish(
        &[creator],
        ServerEvent::RoomCreated {
            room_code: created.room_code.clone(),
            seat: Seat::First,
        },
    );
    Ok(created.room_code)
}

pub async fn join_room(
    ctx: &ApiContext,
    joiner: ConnectionId,
    raw_code: &str,
) -> Result<Seat, ApiError> {
    let mut hub = ctx.hub.lock().await;
    let Hub { rooms, outboxes } = &mut *hub;
    let joined = rooms.join_room(raw_code, joiner)?;
    if let Some(departure) = &joined.departed {
        outboxes.announce_departure(departure);
    }

    outboxes.publish(
        &[joiner],
        ServerEvent::RoomJoined {
            game: joined.game.clone(),
            seat: joined.seat,
        },
    );
    outboxes.publish(
        &joined.occupants,
        ServerEvent::JoinedWaiting {
            player_count: joined.occupants.len(),
        },
    );
    outboxes.publish(
        &joined.occupants,
        ServerEvent::ReadyUpdate {
            ready: joined.ready,
        },
    );
    if joined.started {
        info!(room_code = %joined.room_code, "match started");
        outboxes.publish(&joined.occupants, ServerEvent::MatchStart { game: joined.game });
    }
    Ok(joined.seat)
}

pub async fn set_ready(
    ctx: &ApiContext,
    connection_id: ConnectionId,
    ready: bool,
) -> Result<ReadySummary, ApiError> {
    let mut hub = ctx.hub.lock().await;
    let Hub { rooms, outboxes } = &mut *hub;
    let change = rooms.set_ready(connection_id, ready)?;
    outboxes.publish(
        &change.occupants,
        ServerEvent::ReadyUpdate {
            ready: change.ready,
        },
    );
    if change.started {
        outboxes.publish(&change.occupants, ServerEvent::MatchStart { game: change.game });
    }
    Ok(change.ready)
}

/// Streaming path: the room and seat come from the session index.
pub async fn submit_move(
    ctx: &ApiContext,
    connection_id: ConnectionId,
    column: usize,
    move_id: Option<Uuid>,
) -> Result<MoveReceipt, ApiError> {
    let mut hub = ctx.hub.lock().await;
    let room_code = hub.rooms.resolve(connection_id)?;
    apply_move(&mut hub, &room_code, connection_id, column, move_id)
}

/// Call path: the request names its room and claims an identity.
///
/// The caller gets the receipt directly and the room receives the same
/// broadcast the streaming path would have produced.
pub async fn submit_move_call(
    ctx: &ApiContext,
    raw_code: &str,
    call: MoveCall,
) -> Result<MoveReceipt, ApiError> {
    let room_code = RoomCode::parse(raw_code)?;
    let mut hub = ctx.hub.lock().await;
    apply_move(
        &mut hub,
        &room_code,
        call.connection_id,
        call.column,
        call.move_id,
    )
}

fn apply_move(
    hub: &mut Hub,
    room_code: &RoomCode,
    connection_id: ConnectionId,
    column: usize,
    move_id: Option<Uuid>,
) -> Result<MoveReceipt, ApiError> {
    let Hub { rooms, outboxes } = hub;
    let room = rooms
        .room_mut(room_code)
        .ok_or(StoreError::RoomNotFound)?;
    let receipt = match room.play(connection_id, column, move_id)? {
        Play::Applied(receipt) => receipt,
        Play::Replayed(receipt) => {
            debug!(%room_code, %connection_id, "duplicate move id replayed");
            return Ok(receipt);
        }
    };

    outboxes.publish(
        room.occupants(),
        ServerEvent::MoveApplied {
            game: receipt.game.clone(),
            row: receipt.row,
            column: receipt.column,
        },
    );
    if let Some(winner) = receipt.winner {
        info!(%room_code, %winner, "match decided");
        outboxes.publish(
            room.occupants(),
            ServerEvent::MatchOver {
                winner,
                winner_name: winner.display_name().to_string(),
            },
        );
    }
    Ok(receipt)
}

pub async fn play_again(
    ctx: &ApiContext,
    connection_id: ConnectionId,
) -> Result<GameSnapshot, ApiError> {
    let mut hub = ctx.hub.lock().await;
    let Hub { rooms, outboxes } = &mut *hub;
    let room_code = rooms.resolve(connection_id)?;
    let room = rooms
        .room_mut(&room_code)
        .ok_or(StoreError::RoomNotFound)?;
    room.reset_for_rematch();
    let game = room.snapshot();
    info!(%room_code, "rematch");
    outboxes.publish(room.occupants(), ServerEvent::RematchState { game: game.clone() });
    Ok(game)
}

/// Explicit leave. The stream stays registered and may create or join again.
pub async fn leave_room(ctx: &ApiContext, connection_id: ConnectionId) -> Option<Departure> {
    let mut hub = ctx.hub.lock().await;
    let Hub { rooms, outboxes } = &mut *hub;
    let departure = rooms.leave(connection_id)?;
    outboxes.announce_departure(&departure);
    Some(departure)
}

/// Current match state for a participant seated in `raw_code`.
pub async fn room_snapshot(
    ctx: &ApiContext,
    raw_code: &str,
    connection_id: ConnectionId,
) -> Result<GameSnapshot, ApiError> {
    let room_code = RoomCode::parse(raw_code)?;
    let hub = ctx.hub.lock().await;
    let room = hub
        .rooms
        .room(&room_code)
        .ok_or(StoreError::RoomNotFound)?;
    if room.seat_of(connection_id).is_none() {
        return Err(StoreError::SeatNotFound.into());
    }
    Ok(room.snapshot())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
