//! Newline-delimited JSON protocol: one request object per line, one
//! response object per line, in order.

use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use ulid::Ulid;

use crate::engine::{Candidate, DesiredByDay, Engine, EngineError, InMemoryStore};
use crate::limits::{MAX_BOOKING_MINUTES, MAX_LINE_LEN};
use crate::model::*;
use crate::observability;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Validate {
        candidate: Candidate,
    },
    ReconcileAvailability {
        instructor_id: Ulid,
        desired: DesiredByDay,
    },
    ListAvailability {
        instructor_id: Ulid,
    },
    PutBooking {
        booking: Booking,
    },
    DeleteBooking {
        id: Ulid,
    },
    PutResource {
        resource: ResourceInfo,
    },
    PutInstructor {
        instructor: InstructorInfo,
    },
    PutCourse {
        course: CourseInfo,
    },
    PutEnrollment {
        enrollment: Enrollment,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    store: Arc<InMemoryStore>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut lines = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));

    while let Some(line) = lines.next().await {
        let response = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match serde_json::from_str::<Request>(&line) {
                Ok(req) => handle(&engine, &store, req).await,
                Err(e) => Response::err(format!("bad request: {e}")),
            },
            // The codec skips the rest of the oversized line on its own.
            Err(LinesCodecError::MaxLineLengthExceeded) => Response::err("request line too long"),
            Err(e) => return Err(e.into()),
        };
        lines.send(serde_json::to_string(&response)?).await?;
    }
    Ok(())
}

pub async fn handle(engine: &Engine, store: &InMemoryStore, req: Request) -> Response {
    let op = observability::op_label(&req);
    let started = Instant::now();
    let response = match dispatch(engine, store, req).await {
        Ok(result) => Response::ok(result),
        Err(e) => {
            tracing::debug!("{op} failed: {e}");
            Response::err(e.to_string())
        }
    };
    let status = if response.ok { "ok" } else { "error" };
    metrics::counter!(observability::REQUESTS_TOTAL, "op" => op, "status" => status).increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
    response
}

async fn dispatch(engine: &Engine, store: &InMemoryStore, req: Request) -> Result<Value, EngineError> {
    match req {
        Request::Validate { candidate } => to_json(&engine.validate(&candidate).await),
        Request::ReconcileAvailability {
            instructor_id,
            desired,
        } => to_json(&engine.reconcile_availability(instructor_id, &desired).await?),
        Request::ListAvailability { instructor_id } => {
            to_json(&engine.list_availability(instructor_id).await?)
        }
        Request::PutBooking { booking } => {
            if booking.duration_minutes.is_some_and(|m| m > MAX_BOOKING_MINUTES) {
                return Err(EngineError::LimitExceeded("booking longer than a day"));
            }
            let id = booking.id;
            store.put_booking(booking);
            Ok(json!({ "id": id }))
        }
        Request::DeleteBooking { id } => {
            store.remove_booking(&id).ok_or(EngineError::NotFound(id))?;
            Ok(json!({ "id": id }))
        }
        Request::PutResource { resource } => {
            let id = resource.id;
            store.put_resource(resource);
            Ok(json!({ "id": id }))
        }
        Request::PutInstructor { instructor } => {
            let id = instructor.id;
            store.put_instructor(instructor);
            Ok(json!({ "id": id }))
        }
        Request::PutCourse { course } => {
            let id = course.id;
            store.put_course(course);
            Ok(json!({ "id": id }))
        }
        Request::PutEnrollment { enrollment } => {
            let id = enrollment.id;
            store.put_enrollment(enrollment);
            Ok(json!({ "id": id }))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::InvalidInput(e.to_string()))
}
