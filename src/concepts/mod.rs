// Concept modules. Each concept owns exactly one collection, enforces its own
// invariants, and refers to other entities only by opaque id. Concepts never
// call each other; cross-concept workflows live in the synchronization layer.

pub mod comment;
pub mod event;
pub mod friend;
pub mod post;
pub mod session;
pub mod trail;
pub mod user;

pub use comment::{Comment, CommentConcept, CommentDoc};
pub use event::{Event, EventConcept, EventDate, EventDoc, EventTags, EventTime};
pub use friend::{FriendConcept, FriendRequest, FriendRequestDoc, Friendship, RequestStatus};
pub use post::{Post, PostConcept, PostDoc};
pub use session::{Session, SessionConcept, SessionDoc};
pub use trail::{Trail, TrailConcept, TrailDoc, TrailStop};
pub use user::{User, UserConcept, UserDoc};
